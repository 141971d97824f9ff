// ============================================================================
// spark-store - Thread-Safe Selector
// ============================================================================
//
// Refreshes always run inside the store's notification pass, which already
// holds the store gate, so two refreshes of one selector never overlap.
// Activation takes the gate too: the initial derive and the subscription
// happen with no mutation in between.
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::core::config::{DebugConfig, RuntimeMode};
use crate::reactivity::diagnostics::{
    DescribeFn, Diagnostics, SharedSink, UpdateStatus, describe_debug,
};
use crate::reactivity::equality::{SameValue, same_value};
use crate::sync::listeners::{SyncListenerSet, SyncUnsubscribe, run_sync_pass};
use crate::sync::store::SyncStore;

type SyncDeriveFn<S, Sel> = Arc<dyn Fn(&S) -> Sel + Send + Sync>;
type SyncEqualsFn<Sel> = Arc<dyn Fn(&Sel, &Sel) -> bool + Send + Sync>;
type SyncDependentFn<Sel> = dyn Fn(&Arc<Sel>) + Send + Sync;

/// Options for a [`SyncSelector`]; mirrors [`SelectOptions`](crate::SelectOptions).
#[must_use]
pub struct SyncSelectOptions<Sel> {
    compare: SyncEqualsFn<Sel>,
    debug: Option<(DebugConfig, DescribeFn<Sel>)>,
    mode: Option<RuntimeMode>,
    sink: Option<SharedSink>,
}

impl<Sel: SameValue + 'static> SyncSelectOptions<Sel> {
    /// Options using the default [`SameValue`] comparator.
    pub fn new() -> Self {
        Self::with_compare(same_value::<Sel>)
    }
}

impl<Sel: SameValue + 'static> Default for SyncSelectOptions<Sel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Sel: 'static> SyncSelectOptions<Sel> {
    /// Options with a custom comparator; for types without [`SameValue`].
    pub fn with_compare(compare: impl Fn(&Sel, &Sel) -> bool + Send + Sync + 'static) -> Self {
        Self {
            compare: Arc::new(compare),
            debug: None,
            mode: None,
            sink: None,
        }
    }

    /// Replace the comparator.
    pub fn compare(mut self, compare: impl Fn(&Sel, &Sel) -> bool + Send + Sync + 'static) -> Self {
        self.compare = Arc::new(compare);
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

struct SyncSelectorInner<S, Sel> {
    store: SyncStore<S>,
    derive: SyncDeriveFn<S, Sel>,
    compare: SyncEqualsFn<Sel>,
    last: ArcSwap<Sel>,
    version: AtomicU64,
    active: AtomicBool,
    subscription: Mutex<Option<SyncUnsubscribe>>,
    dependents: SyncListenerSet<SyncDependentFn<Sel>>,
    diagnostics: Option<Diagnostics<Sel>>,
}

impl<S: Send + Sync + 'static, Sel: Send + Sync + 'static> SyncSelectorInner<S, Sel> {
    fn emit(&self, status: UpdateStatus, prev: Option<&Sel>, next: &Sel) {
        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.emit(status, prev, next, self.store.listener_count());
        }
    }

    fn refresh(&self) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        let candidate = Arc::new(self.store.with(|state| (self.derive)(state)));
        let prev = self.last.load_full();

        if (self.compare)(&prev, &candidate) {
            self.emit(UpdateStatus::NoNewSelectedState, Some(&prev), &candidate);
            return;
        }

        self.last.store(Arc::clone(&candidate));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.emit(UpdateStatus::NewSelectedState, Some(&prev), &candidate);
        drop(prev);

        tracing::trace!(version, "sync selector delivered");

        let report = run_sync_pass(self.dependents.snapshot(), |dependent| {
            if Arc::ptr_eq(&self.last.load_full(), &candidate) {
                dependent(&candidate);
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
        self.active.store(false, Ordering::Release);
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}

impl<S, Sel> Drop for SyncSelectorInner<S, Sel> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        let subscription = self
            .subscription
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}

/// A [`Selector`](crate::Selector) over a [`SyncStore`].
pub struct SyncSelector<S, Sel> {
    inner: Arc<SyncSelectorInner<S, Sel>>,
}

impl<S, Sel> Clone for SyncSelector<S, Sel> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Send + Sync + 'static, Sel: Send + Sync + 'static> SyncSelector<S, Sel> {
    /// Subscribe to `store` and compute the initial selection.
    pub fn new(
        store: &SyncStore<S>,
        derive: impl Fn(&S) -> Sel + Send + Sync + 'static,
        options: SyncSelectOptions<Sel>,
    ) -> Self {
        let SyncSelectOptions {
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

        let derive: SyncDeriveFn<S, Sel> = Arc::new(derive);
        let _pass = store.exclusive();
        let initial = store.with(|state| derive(state));

        let inner = Arc::new(SyncSelectorInner {
            store: store.clone(),
            derive,
            compare,
            last: ArcSwap::from_pointee(initial),
            version: AtomicU64::new(0),
            active: AtomicBool::new(true),
            subscription: Mutex::new(None),
            dependents: SyncListenerSet::new(),
            diagnostics,
        });

        let weak = Arc::downgrade(&inner);
        let subscription = store.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        });
        *inner
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);

        let initial = inner.last.load_full();
        inner.emit(UpdateStatus::InitialRender, None, &initial);

        Self { inner }
    }

    /// The last delivered value; the same `Arc` until a change is delivered.
    #[must_use]
    pub fn get(&self) -> Arc<Sel> {
        self.inner.last.load_full()
    }

    /// Number of changed values delivered since activation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Register a callback for delivered changes. It runs on the mutating
    /// thread, inside the store's notification pass.
    pub fn subscribe(
        &self,
        dependent: impl Fn(&Arc<Sel>) + Send + Sync + 'static,
    ) -> SyncUnsubscribe {
        let (id, active) = self.inner.dependents.insert(Arc::new(dependent));
        let weak = Arc::downgrade(&self.inner);
        SyncUnsubscribe::new(id, active, move || {
            if let Some(inner) = weak.upgrade() {
                inner.dependents.remove(id);
            }
        })
    }

    /// Stop observing the store. Idempotent.
    pub fn unsubscribe(&self) {
        self.inner.deactivate();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Derive from the current state without comparing or delivering.
    #[must_use]
    pub fn derive_snapshot(&self) -> Sel {
        self.inner.store.with(|state| (self.inner.derive)(state))
    }
}

impl<S, Sel: fmt::Debug> fmt::Debug for SyncSelector<S, Sel> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSelector")
            .field("value", &self.inner.last.load_full())
            .field("version", &self.inner.version.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<S: Send + Sync + 'static> SyncStore<S> {
    /// Bind a selector using the default [`SameValue`] comparator.
    pub fn select<Sel>(
        &self,
        derive: impl Fn(&S) -> Sel + Send + Sync + 'static,
    ) -> SyncSelector<S, Sel>
    where
        Sel: SameValue + Send + Sync + 'static,
    {
        SyncSelector::new(self, derive, SyncSelectOptions::new())
    }

    /// Bind a selector with explicit options.
    pub fn select_with<Sel: Send + Sync + 'static>(
        &self,
        derive: impl Fn(&S) -> Sel + Send + Sync + 'static,
        options: SyncSelectOptions<Sel>,
    ) -> SyncSelector<S, Sel> {
        SyncSelector::new(self, derive, options)
    }
}
