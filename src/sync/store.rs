// ============================================================================
// spark-store - Thread-Safe Store
// ============================================================================
//
// State is published through an ArcSwap so readers on any thread get a
// complete snapshot without blocking. Writers take the store's reentrant
// gate, so notification passes never interleave; a listener on the writing
// thread may still call `set_state` and the nested pass completes first.
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::core::config::{DebugConfig, RuntimeMode};
use crate::core::error::Result;
use crate::reactivity::diagnostics::{
    DescribeFn, Diagnostics, SharedSink, TracingSink, UpdateStatus, describe_debug,
};
use crate::sync::gate::{GateGuard, ReentrantGate};
use crate::sync::listeners::{SyncListenerSet, SyncUnsubscribe, run_sync_pass};

pub(crate) struct SyncStoreInner<S> {
    state: ArcSwap<S>,
    version: AtomicU64,
    gate: ReentrantGate,
    listeners: SyncListenerSet<dyn Fn() + Send + Sync>,
    mode: RuntimeMode,
    sink: SharedSink,
    diagnostics: Option<Diagnostics<S>>,
}

/// A [`Store`](crate::Store) that can be shared across threads.
///
/// # Example
///
/// ```
/// use std::thread;
/// use spark_store::SyncStore;
///
/// let store = SyncStore::new(0u64);
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let store = store.clone();
///         thread::spawn(move || store.set_state(|n| n + 1).unwrap())
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
/// assert_eq!(*store.snapshot(), 4);
/// ```
pub struct SyncStore<S> {
    inner: Arc<SyncStoreInner<S>>,
}

impl<S> Clone for SyncStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Send + Sync + 'static> SyncStore<S> {
    /// Create a store with no diagnostics and the build-profile runtime mode.
    pub fn new(initial: S) -> Self {
        Self::builder(initial).build()
    }

    /// Start configuring a store with diagnostics, mode or sink.
    pub fn builder(initial: S) -> SyncStoreBuilder<S> {
        SyncStoreBuilder {
            initial,
            mode: RuntimeMode::default(),
            sink: None,
            debug: None,
        }
    }

    /// The current state. Never blocks on writers.
    #[must_use]
    pub fn snapshot(&self) -> Arc<S> {
        self.inner.state.load_full()
    }

    /// Read the current state without cloning the handle.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.snapshot();
        f(&state)
    }

    /// Replace the state and notify every listener on the calling thread.
    ///
    /// Blocks while another thread is mid-pass on this store.
    pub fn set_state(&self, transition: impl FnOnce(&S) -> S) -> Result<()> {
        let _pass = self.inner.gate.enter();

        let prev = self.inner.state.load_full();
        let next = Arc::new(transition(&prev));
        self.inner.state.store(Arc::clone(&next));
        let version = self.inner.version.fetch_add(1, Ordering::AcqRel) + 1;

        let listener_count = self.listener_count();
        if let Some(diagnostics) = &self.inner.diagnostics {
            diagnostics.emit(UpdateStatus::StateUpdate, Some(&prev), &next, listener_count);
        }
        drop(prev);

        tracing::trace!(version, listeners = listener_count, "sync store state replaced");

        let report = run_sync_pass(self.inner.listeners.snapshot(), |listener| listener());
        report.into_result()
    }

    /// Replace the state with `next` and notify every listener.
    pub fn set(&self, next: S) -> Result<()> {
        self.set_state(move |_| next)
    }

    /// Register a listener. It runs on whichever thread mutates the store.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SyncUnsubscribe {
        let (id, active) = self.inner.listeners.insert(Arc::new(listener));
        let weak = Arc::downgrade(&self.inner);
        SyncUnsubscribe::new(id, active, move || {
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
        self.inner.version.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.inner.mode
    }

    #[must_use]
    pub fn debug_config(&self) -> Option<&DebugConfig> {
        self.inner.diagnostics.as_ref().map(Diagnostics::config)
    }

    /// Whether two handles point at the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn sink(&self) -> SharedSink {
        Arc::clone(&self.inner.sink)
    }

    /// Hold the pass gate; no other thread can mutate until the guard drops.
    pub(crate) fn exclusive(&self) -> GateGuard<'_> {
        self.inner.gate.enter()
    }
}

impl<S: fmt::Debug> fmt::Debug for SyncStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncStore")
            .field("state", &self.inner.state.load_full())
            .field("version", &self.inner.version.load(Ordering::Acquire))
            .field("mode", &self.inner.mode)
            .finish_non_exhaustive()
    }
}

/// Configures a [`SyncStore`] before creation.
#[must_use = "call .build() to create the store"]
pub struct SyncStoreBuilder<S> {
    initial: S,
    mode: RuntimeMode,
    sink: Option<SharedSink>,
    debug: Option<(DebugConfig, DescribeFn<S>)>,
}

impl<S: Send + Sync + 'static> SyncStoreBuilder<S> {
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
    pub fn sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Create the store. The sink defaults to [`TracingSink`].
    pub fn build(self) -> SyncStore<S> {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let diagnostics = self
            .debug
            .map(|(config, describe)| Diagnostics::new(config, self.mode, Arc::clone(&sink), describe));

        SyncStore {
            inner: Arc::new(SyncStoreInner {
                state: ArcSwap::from_pointee(self.initial),
                version: AtomicU64::new(0),
                gate: ReentrantGate::new(),
                listeners: SyncListenerSet::new(),
                mode: self.mode,
                sink,
                diagnostics,
            }),
        }
    }
}
