// ============================================================================
// spark-store - Selector Binding
// Derive a slice of store state and re-deliver only when the slice changes
// ============================================================================
//
// A selector subscribes one listener to its store. On every store
// notification it re-derives from the fresh snapshot and compares the
// candidate against the last delivered value:
//
//   equal     -> keep the OLD value (same Rc), no delivery
//   not equal -> replace, bump version, notify dependents
//
// The derive function and comparator are user code, so no RefCell borrow is
// held while they run. Both may read the store or the selector itself.
//
// Lifetime: the store holds only a Weak to the selector. Dropping the last
// Selector handle unsubscribes from the store.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::config::{DebugConfig, RuntimeMode};
use crate::core::types::{DependentFn, DeriveFn, EqualsFn};
use crate::primitives::store::Store;
use crate::reactivity::diagnostics::{
    DescribeFn, Diagnostics, SharedSink, UpdateStatus, describe_debug,
};
use crate::reactivity::equality::{SameValue, same_value};
use crate::reactivity::listeners::{ListenerSet, Unsubscribe, run_pass};

// =============================================================================
// OPTIONS
// =============================================================================

/// Comparator and diagnostics settings for a [`Selector`].
///
/// Mode and sink default to the store's when left unset.
#[must_use]
pub struct SelectOptions<Sel> {
    compare: EqualsFn<Sel>,
    debug: Option<(DebugConfig, DescribeFn<Sel>)>,
    mode: Option<RuntimeMode>,
    sink: Option<SharedSink>,
}

impl<Sel: SameValue + 'static> SelectOptions<Sel> {
    /// Options using the default [`SameValue`] comparator.
    pub fn new() -> Self {
        Self::with_compare(same_value::<Sel>)
    }
}

impl<Sel: SameValue + 'static> Default for SelectOptions<Sel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Sel: 'static> SelectOptions<Sel> {
    /// Options with a custom comparator; for types without [`SameValue`].
    pub fn with_compare(compare: impl Fn(&Sel, &Sel) -> bool + 'static) -> Self {
        Self {
            compare: Rc::new(compare),
            debug: None,
            mode: None,
            sink: None,
        }
    }

    /// Replace the comparator. Return `true` when the two values should be
    /// treated as the same.
    pub fn compare(mut self, compare: impl Fn(&Sel, &Sel) -> bool + 'static) -> Self {
        self.compare = Rc::new(compare);
        self
    }

    /// Emit diagnostics for this selector under `config`.
    pub fn debug(mut self, config: DebugConfig) -> Self
    where
        Sel: fmt::Debug,
    {
        self.debug = Some((config, describe_debug::<Sel>));
        self
    }

    /// Override the store's runtime mode for this selector's diagnostics.
    pub fn mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Override the store's diagnostic sink for this selector.
    pub fn sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

// =============================================================================
// SELECTOR INNER
// =============================================================================

struct SelectorInner<S: 'static, Sel: 'static> {
    store: Store<S>,
    derive: DeriveFn<S, Sel>,
    compare: EqualsFn<Sel>,

    /// Last delivered value. Set once at activation, replaced only on change.
    last: RefCell<Rc<Sel>>,

    /// Deliveries since activation
    version: Cell<u64>,

    active: Cell<bool>,
    subscription: RefCell<Option<Unsubscribe>>,
    dependents: ListenerSet<dyn Fn(&Rc<Sel>)>,
    diagnostics: Option<Diagnostics<Sel>>,
}

enum Outcome<Sel> {
    Unchanged { kept: Rc<Sel>, candidate: Rc<Sel> },
    Changed { prev: Rc<Sel>, next: Rc<Sel> },
}

impl<S: 'static, Sel: 'static> SelectorInner<S, Sel> {
    fn emit(&self, status: UpdateStatus, prev: Option<&Sel>, next: &Sel) {
        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.emit(status, prev, next, self.store.listener_count());
        }
    }

    /// Store listener body: re-derive, compare, maybe deliver.
    fn refresh(&self) {
        if !self.active.get() {
            return;
        }

        let state = self.store.snapshot();
        let candidate = Rc::new((self.derive)(&state));
        drop(state);

        let prev = Rc::clone(&self.last.borrow());
        let outcome = if (self.compare)(&prev, &candidate) {
            Outcome::Unchanged {
                kept: prev,
                candidate,
            }
        } else {
            Outcome::Changed {
                prev,
                next: candidate,
            }
        };

        match outcome {
            Outcome::Unchanged { kept, candidate } => {
                self.emit(UpdateStatus::NoNewSelectedState, Some(&kept), &candidate);
            }
            Outcome::Changed { prev, next } => {
                self.last.replace(Rc::clone(&next));
                let version = self.version.get() + 1;
                self.version.set(version);
                self.emit(UpdateStatus::NewSelectedState, Some(&prev), &next);
                drop(prev);

                tracing::trace!(version, dependents = self.dependents.len(), "selector delivered");
                self.deliver(&next);
            }
        }
    }

    fn deliver(&self, next: &Rc<Sel>) {
        let report = run_pass(self.dependents.snapshot(), |dependent| {
            // A nested store update may already have replaced `next`; later
            // dependents must not receive the superseded value.
            if Rc::ptr_eq(&self.last.borrow(), next) {
                dependent(next);
            }
        });
        if report.failed > 0 {
            tracing::warn!(
                failed = report.failed,
                notified = report.notified,
                "selector dependents panicked"
            );
        }
    }

    fn deactivate(&self) {
        self.active.set(false);
        let subscription = self.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}

impl<S: 'static, Sel: 'static> Drop for SelectorInner<S, Sel> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

// =============================================================================
// SELECTOR<S, Sel> - The public binding handle
// =============================================================================

/// An active selection over a [`Store`].
///
/// # Example
///
/// ```
/// use spark_store::Store;
///
/// #[derive(Clone)]
/// struct App { count: i32, name: String }
///
/// let store = Store::new(App { count: 0, name: "a".into() });
/// let count = store.select(|app: &App| app.count);
///
/// store.set_state(|app| App { name: "b".into(), ..app.clone() }).unwrap();
/// assert_eq!(count.version(), 0);
///
/// store.set_state(|app| App { count: 1, ..app.clone() }).unwrap();
/// assert_eq!(*count.get(), 1);
/// assert_eq!(count.version(), 1);
/// ```
pub struct Selector<S: 'static, Sel: 'static> {
    inner: Rc<SelectorInner<S, Sel>>,
}

impl<S: 'static, Sel: 'static> Clone for Selector<S, Sel> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: 'static, Sel: 'static> Selector<S, Sel> {
    /// Subscribe to `store` and compute the initial selection.
    pub fn new(
        store: &Store<S>,
        derive: impl Fn(&S) -> Sel + 'static,
        options: SelectOptions<Sel>,
    ) -> Self {
        let SelectOptions {
            compare,
            debug,
            mode,
            sink,
        } = options;

        let diagnostics = debug.map(|(config, describe)| {
            Diagnostics::new(
                config,
                mode.unwrap_or_else(|| store.mode()),
                sink.unwrap_or_else(|| store.sink()),
                describe,
            )
        });

        let derive: DeriveFn<S, Sel> = Rc::new(derive);
        let initial = Rc::new(store.with(|state| derive(state)));

        let inner = Rc::new(SelectorInner {
            store: store.clone(),
            derive,
            compare,
            last: RefCell::new(initial),
            version: Cell::new(0),
            active: Cell::new(true),
            subscription: RefCell::new(None),
            dependents: ListenerSet::new(),
            diagnostics,
        });

        let weak = Rc::downgrade(&inner);
        let subscription = store.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        });
        *inner.subscription.borrow_mut() = Some(subscription);

        let initial = Rc::clone(&inner.last.borrow());
        inner.emit(UpdateStatus::InitialRender, None, &initial);

        Self { inner }
    }

    /// The last delivered value.
    ///
    /// Successive calls return the same `Rc` until a change is delivered.
    #[must_use]
    pub fn get(&self) -> Rc<Sel> {
        Rc::clone(&self.inner.last.borrow())
    }

    /// Read the last delivered value without cloning the handle.
    pub fn with<R>(&self, f: impl FnOnce(&Sel) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    /// Number of changed values delivered since activation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Register a callback for delivered changes. It runs synchronously
    /// inside the store's notification pass.
    pub fn subscribe(&self, dependent: impl Fn(&Rc<Sel>) + 'static) -> Unsubscribe {
        let dependent: DependentFn<Sel> = Rc::new(dependent);
        let (id, active) = self.inner.dependents.insert(dependent);
        let weak = Rc::downgrade(&self.inner);
        Unsubscribe::new(id, active, move || {
            if let Some(inner) = weak.upgrade() {
                inner.dependents.remove(id);
            }
        })
    }

    /// Number of registered dependents.
    #[must_use]
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    /// Stop observing the store. The last delivered value stays readable.
    /// Idempotent.
    pub fn unsubscribe(&self) {
        self.inner.deactivate();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Run the derive function against the current store state without
    /// comparing or delivering.
    #[must_use]
    pub fn derive_snapshot(&self) -> Sel {
        self.inner.store.with(|state| (self.inner.derive)(state))
    }

    /// The store this selector observes.
    #[must_use]
    pub fn store(&self) -> &Store<S> {
        &self.inner.store
    }

    #[must_use]
    pub fn debug_config(&self) -> Option<&DebugConfig> {
        self.inner.diagnostics.as_ref().map(Diagnostics::config)
    }
}

impl<S: 'static, Sel: fmt::Debug + 'static> fmt::Debug for Selector<S, Sel> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("value", &self.inner.last.borrow())
            .field("version", &self.inner.version.get())
            .field("active", &self.inner.active.get())
            .field("dependents", &self.inner.dependents.len())
            .finish()
    }
}

// =============================================================================
// STORE EXTENSIONS
// =============================================================================

impl<S: 'static> Store<S> {
    /// Bind a selector using the default [`SameValue`] comparator.
    pub fn select<Sel>(&self, derive: impl Fn(&S) -> Sel + 'static) -> Selector<S, Sel>
    where
        Sel: SameValue + 'static,
    {
        Selector::new(self, derive, SelectOptions::new())
    }

    /// Bind a selector with explicit options.
    pub fn select_with<Sel: 'static>(
        &self,
        derive: impl Fn(&S) -> Sel + 'static,
        options: SelectOptions<Sel>,
    ) -> Selector<S, Sel> {
        Selector::new(self, derive, options)
    }
}

/// Derive once from the current state. Nothing is subscribed.
pub fn select_snapshot<S: 'static, Sel>(store: &Store<S>, derive: impl FnOnce(&S) -> Sel) -> Sel {
    store.with(derive)
}

// =============================================================================
// TESTS
// =============================================================================
