// ============================================================================
// spark-store - Diagnostics
// Debug events for store updates and selector deliveries
// ============================================================================
//
// One event per notable transition, carrying a name tag, the previous and
// next values (rendered with Debug), the store's listener count and one of
// four statuses. Emission is gated on the attached DebugConfig AND the
// injected RuntimeMode. A panic while rendering values or inside the sink
// loses that one event and nothing else.
// ============================================================================

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::config::{DebugConfig, RuntimeMode};
use crate::core::constants::{
    DIAGNOSTICS_TARGET, INITIAL_RENDER, NEW_SELECTED_STATE, NO_NEW_SELECTED_STATE, STATE_UPDATE,
};
use crate::reactivity::notify::panic_message;

// =============================================================================
// EVENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateStatus {
    StateUpdate,
    InitialRender,
    NewSelectedState,
    NoNewSelectedState,
}

impl UpdateStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StateUpdate => STATE_UPDATE,
            Self::InitialRender => INITIAL_RENDER,
            Self::NewSelectedState => NEW_SELECTED_STATE,
            Self::NoNewSelectedState => NO_NEW_SELECTED_STATE,
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub name: String,
    pub status: UpdateStatus,
    /// `None` for the initial render.
    pub prev: Option<String>,
    pub next: String,
    pub listener_count: usize,
}

// =============================================================================
// SINKS
// =============================================================================

/// Receiver for diagnostic events. Must not touch store state.
pub trait DiagnosticSink {
    fn emit(&self, event: &DiagnosticEvent);
}

/// Shared, thread-safe sink handle.
pub type SharedSink = Arc<dyn DiagnosticSink + Send + Sync>;

/// Forwards events to `tracing` at DEBUG level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: &DiagnosticEvent) {
        tracing::debug!(
            target: DIAGNOSTICS_TARGET,
            name = %event.name,
            status = %event.status,
            prev = event.prev.as_deref().unwrap_or("<none>"),
            next = %event.next,
            listeners = event.listener_count,
            "store diagnostic"
        );
    }
}

/// Records every event in memory.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use spark_store::{DebugConfig, MemorySink, RuntimeMode, Store, UpdateStatus};
///
/// let sink = Arc::new(MemorySink::new());
/// let store = Store::builder(1)
///     .debug(DebugConfig::new("counter"))
///     .mode(RuntimeMode::Development)
///     .sink(sink.clone())
///     .build();
///
/// store.set(2).unwrap();
/// assert_eq!(sink.statuses(), vec![UpdateStatus::StateUpdate]);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<UpdateStatus> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.status)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, event: &DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// Renders a value for an event.
pub(crate) type DescribeFn<T> = fn(&T) -> String;

pub(crate) fn describe_debug<T: fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

/// Everything a store or selector needs to emit events about values of `T`.
pub(crate) struct Diagnostics<T: ?Sized> {
    config: DebugConfig,
    mode: RuntimeMode,
    sink: SharedSink,
    describe: DescribeFn<T>,
}

impl<T: ?Sized> Diagnostics<T> {
    pub(crate) fn new(
        config: DebugConfig,
        mode: RuntimeMode,
        sink: SharedSink,
        describe: DescribeFn<T>,
    ) -> Self {
        Self {
            config,
            mode,
            sink,
            describe,
        }
    }

    pub(crate) fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub(crate) fn is_live(&self) -> bool {
        self.config.enabled && self.mode.allows_diagnostics()
    }

    pub(crate) fn emit(
        &self,
        status: UpdateStatus,
        prev: Option<&T>,
        next: &T,
        listener_count: usize,
    ) {
        if !self.is_live() {
            return;
        }

        // Rendering runs user Debug impls, so it shares the sink's guard.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let event = DiagnosticEvent {
                name: self.config.name.clone(),
                status,
                prev: prev.map(self.describe),
                next: (self.describe)(next),
                listener_count,
            };
            self.sink.emit(&event);
        }));

        if let Err(payload) = outcome {
            tracing::warn!(
                name = %self.config.name,
                status = %status,
                panic = %panic_message(payload.as_ref()),
                "diagnostic emit panicked; event dropped"
            );
        }
    }
}

impl<T: ?Sized> fmt::Debug for Diagnostics<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
