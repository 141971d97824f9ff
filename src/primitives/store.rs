// ============================================================================
// spark-store - Store Primitive
// Shared state cell with an opaque listener registry
// ============================================================================
//
// The store replaces its state wholesale on every mutation and always
// notifies: there is no equality check at this level. Deciding whether a
// mutation matters to a given observer is the selector's job.
//
// State lives behind `Rc<S>` so a snapshot handed out before a mutation is
// never changed underneath its holder, and the RefCell borrow is never held
// while user code (transitions, listeners, sinks) runs. That is what makes
// nested `set_state` calls from inside a listener legal: the nested pass
// runs to completion before control returns to the outer listener.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::core::config::{DebugConfig, RuntimeMode};
use crate::core::error::Result;
use crate::core::types::ListenerFn;
use crate::reactivity::diagnostics::{
    DescribeFn, Diagnostics, SharedSink, TracingSink, UpdateStatus, describe_debug,
};
use crate::reactivity::listeners::{ListenerSet, Unsubscribe, run_pass};

// =============================================================================
// STORE INNER
// =============================================================================

pub(crate) struct StoreInner<S> {
    state: RefCell<Rc<S>>,

    /// Completed mutations since creation
    version: Cell<u64>,

    listeners: ListenerSet<dyn Fn()>,

    mode: RuntimeMode,
    sink: SharedSink,
    diagnostics: Option<Diagnostics<S>>,
}

// =============================================================================
// STORE<S> - The public store handle
// =============================================================================

/// A shared state cell observed by many independent listeners.
///
/// Cloning a `Store` creates another handle to the same state and listeners.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_store::Store;
///
/// let store = Store::new(0);
/// let calls = Rc::new(Cell::new(0));
///
/// let unsubscribe = store.subscribe({
///     let calls = calls.clone();
///     move || calls.set(calls.get() + 1)
/// });
///
/// store.set_state(|n| n + 1).unwrap();
/// assert_eq!(*store.snapshot(), 1);
/// assert_eq!(calls.get(), 1);
///
/// unsubscribe.unsubscribe();
/// store.set_state(|n| n + 1).unwrap();
/// assert_eq!(calls.get(), 1);
/// ```
pub struct Store<S> {
    inner: Rc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: 'static> Store<S> {
    /// Create a store with no diagnostics and the build-profile runtime mode.
    pub fn new(initial: S) -> Self {
        Self::builder(initial).build()
    }

    /// Start configuring a store with diagnostics, mode or sink.
    pub fn builder(initial: S) -> StoreBuilder<S> {
        StoreBuilder {
            initial,
            mode: RuntimeMode::default(),
            sink: None,
            debug: None,
        }
    }

    /// The current state. Never a partially applied value.
    #[must_use]
    pub fn snapshot(&self) -> Rc<S> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Read the current state without cloning the handle.
    ///
    /// `f` may itself mutate the store; it keeps seeing the value it was
    /// called with.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.snapshot();
        f(&state)
    }

    /// Replace the state with `transition(current)` and notify every listener.
    ///
    /// Listeners run synchronously, in registration order, before this
    /// returns. A panicking listener is logged and skipped over; the pass
    /// continues and the error is reported once all listeners have run.
    ///
    /// If `transition` itself panics, the state is left untouched and the
    /// panic propagates to the caller.
    pub fn set_state(&self, transition: impl FnOnce(&S) -> S) -> Result<()> {
        let prev = self.snapshot();
        let next = Rc::new(transition(&prev));
        self.inner.state.replace(Rc::clone(&next));

        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);

        let listener_count = self.listener_count();
        if let Some(diagnostics) = &self.inner.diagnostics {
            diagnostics.emit(UpdateStatus::StateUpdate, Some(&prev), &next, listener_count);
        }
        drop(prev);

        tracing::trace!(version, listeners = listener_count, "store state replaced");

        let report = run_pass(self.inner.listeners.snapshot(), |listener| listener());
        report.into_result()
    }

    /// Replace the state with `next` and notify every listener.
    pub fn set(&self, next: S) -> Result<()> {
        self.set_state(move |_| next)
    }

    /// Register a listener. The same closure subscribed twice is two
    /// registrations.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Unsubscribe {
        let listener: ListenerFn = Rc::new(listener);
        let (id, active) = self.inner.listeners.insert(listener);
        let weak = Rc::downgrade(&self.inner);
        Unsubscribe::new(id, active, move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.remove(id);
            }
        })
    }

    /// Number of registered listeners, selectors included.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Number of completed `set_state` calls.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.inner.mode
    }

    #[must_use]
    pub fn debug_config(&self) -> Option<&DebugConfig> {
        self.inner.diagnostics.as_ref().map(Diagnostics::config)
    }

    pub(crate) fn sink(&self) -> SharedSink {
        Arc::clone(&self.inner.sink)
    }

    /// Whether two handles point at the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.borrow())
            .field("version", &self.inner.version.get())
            .field("listeners", &self.inner.listeners.len())
            .field("mode", &self.inner.mode)
            .finish()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Configures a [`Store`] before creation.
///
/// # Example
///
/// ```
/// use spark_store::{DebugConfig, RuntimeMode, Store};
///
/// let store = Store::builder(vec![1, 2, 3])
///     .debug(DebugConfig::new("items"))
///     .mode(RuntimeMode::Production)
///     .build();
///
/// assert_eq!(store.debug_config().map(|c| c.name.as_str()), Some("items"));
/// ```
#[must_use = "call .build() to create the store"]
pub struct StoreBuilder<S> {
    initial: S,
    mode: RuntimeMode,
    sink: Option<SharedSink>,
    debug: Option<(DebugConfig, DescribeFn<S>)>,
}

impl<S: 'static> StoreBuilder<S> {
    /// Attach a debug config. Immutable once the store is built.
    pub fn debug(mut self, config: DebugConfig) -> Self
    where
        S: fmt::Debug,
    {
        self.debug = Some((config, describe_debug::<S>));
        self
    }

    /// Runtime mode for this store and the default for its selectors.
    pub fn mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Diagnostic sink for this store and the default for its selectors.
    /// Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Create the store. The sink defaults to [`TracingSink`].
    pub fn build(self) -> Store<S> {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let diagnostics = self
            .debug
            .map(|(config, describe)| Diagnostics::new(config, self.mode, Arc::clone(&sink), describe));

        Store {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(self.initial)),
                version: Cell::new(0),
                listeners: ListenerSet::new(),
                mode: self.mode,
                sink,
                diagnostics,
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StoreError;
    use crate::reactivity::diagnostics::MemorySink;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        count: i32,
        name: &'static str,
    }

    fn counter(count: i32) -> Counter {
        Counter {
            count,
            name: "test",
        }
    }

    #[test]
    fn snapshot_reflects_latest_transition() {
        let store = Store::new(counter(0));
        store
            .set_state(|s| Counter {
                count: s.count + 5,
                ..s.clone()
            })
            .unwrap();
        assert_eq!(store.snapshot().count, 5);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn old_snapshot_is_not_mutated() {
        let store = Store::new(counter(1));
        let before = store.snapshot();
        store.set(counter(2)).unwrap();
        assert_eq!(before.count, 1);
        assert_eq!(store.snapshot().count, 2);
    }

    #[test]
    fn always_notifies_even_when_equal() {
        let store = Store::new(7);
        let hits = Rc::new(Cell::new(0));
        let _sub = store.subscribe({
            let hits = hits.clone();
            move || hits.set(hits.get() + 1)
        });

        store.set(7).unwrap();
        store.set_state(|n| *n).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn listener_sees_committed_state() {
        let store = Store::new(0);
        let seen = Rc::new(Cell::new(-1));
        let _sub = store.subscribe({
            let store = store.clone();
            let seen = seen.clone();
            move || seen.set(*store.snapshot())
        });

        store.set(42).unwrap();
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn unsubscribe_twice_is_noop() {
        let store = Store::new(0);
        let hits = Rc::new(Cell::new(0));
        let sub = store.subscribe({
            let hits = hits.clone();
            move || hits.set(hits.get() + 1)
        });
        assert_eq!(store.listener_count(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);
        assert!(!sub.is_subscribed());

        store.set(1).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn unsubscribe_after_store_dropped() {
        let store = Store::new(0);
        let sub = store.subscribe(|| {});
        drop(store);
        sub.unsubscribe();
        assert!(!sub.is_subscribed());
    }

    #[test]
    fn listener_can_unsubscribe_itself_mid_pass() {
        let store = Store::new(0);
        let hits = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let sub = store.subscribe({
            let hits = hits.clone();
            let slot = slot.clone();
            move || {
                hits.set(hits.get() + 1);
                if let Some(sub) = slot.borrow().as_ref() {
                    sub.unsubscribe();
                }
            }
        });
        *slot.borrow_mut() = Some(sub);

        store.set(1).unwrap();
        store.set(2).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn listener_removed_by_earlier_listener_is_skipped() {
        let store = Store::new(0);
        let second_hits = Rc::new(Cell::new(0));
        let second_slot: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let _first = store.subscribe({
            let second_slot = second_slot.clone();
            move || {
                if let Some(sub) = second_slot.borrow().as_ref() {
                    sub.unsubscribe();
                }
            }
        });
        let second = store.subscribe({
            let second_hits = second_hits.clone();
            move || second_hits.set(second_hits.get() + 1)
        });
        *second_slot.borrow_mut() = Some(second);

        store.set(1).unwrap();
        assert_eq!(second_hits.get(), 0);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn nested_mutation_completes_before_outer_listener_resumes() {
        let store = Store::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let _bump = store.subscribe({
            let store = store.clone();
            let log = log.clone();
            move || {
                let value = *store.snapshot();
                log.borrow_mut().push(format!("outer saw {value}"));
                if value == 1 {
                    store.set(2).unwrap();
                    log.borrow_mut()
                        .push(format!("outer resumed at {}", store.snapshot()));
                }
            }
        });

        store.set(1).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["outer saw 1", "outer saw 2", "outer resumed at 2"]
        );
        assert_eq!(*store.snapshot(), 2);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let store = Store::new(0);
        let after = Rc::new(Cell::new(0));

        let _bad = store.subscribe(|| panic!("listener failure"));
        let _good = store.subscribe({
            let after = after.clone();
            move || after.set(after.get() + 1)
        });

        let result = store.set(9);
        assert_eq!(
            result,
            Err(StoreError::ListenerPanicked {
                failed: 1,
                notified: 2
            })
        );
        assert_eq!(after.get(), 1);
        assert_eq!(*store.snapshot(), 9);
        assert_eq!(store.listener_count(), 2);

        // The store keeps working afterwards
        let _ = store.set(10);
        assert_eq!(after.get(), 2);
    }

    #[test]
    fn panicking_transition_leaves_state_untouched() {
        let store = Store::new(3);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = store.set_state(|_| panic!("bad transition"));
        }));
        assert!(result.is_err());
        assert_eq!(*store.snapshot(), 3);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn state_update_event_carries_prev_next_and_count() {
        let sink = Arc::new(MemorySink::new());
        let store = Store::builder(1)
            .debug(DebugConfig::new("counter"))
            .mode(RuntimeMode::Development)
            .sink(sink.clone())
            .build();
        let _a = store.subscribe(|| {});
        let _b = store.subscribe(|| {});

        store.set(2).unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "counter");
        assert_eq!(events[0].status, UpdateStatus::StateUpdate);
        assert_eq!(events[0].prev.as_deref(), Some("1"));
        assert_eq!(events[0].next, "2");
        assert_eq!(events[0].listener_count, 2);
    }

    #[test]
    fn production_store_emits_nothing() {
        let sink = Arc::new(MemorySink::new());
        let store = Store::builder(1)
            .debug(DebugConfig::new("counter"))
            .mode(RuntimeMode::Production)
            .sink(sink.clone())
            .build();
        store.set(2).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn clones_share_state_and_listeners() {
        let a = Store::new(String::from("a"));
        let b = a.clone();
        assert!(a.ptr_eq(&b));

        let _sub = a.subscribe(|| {});
        b.set(String::from("b")).unwrap();
        assert_eq!(*a.snapshot(), "b");
        assert_eq!(b.listener_count(), 1);
        assert!(!a.ptr_eq(&Store::new(String::new())));
    }
}
