// ============================================================================
// spark-store - Notification Pass
// Panic-isolated invocation of a point-in-time listener snapshot
// ============================================================================
//
// Failure policy: isolate per listener. Each callback runs under
// catch_unwind; a panicking listener is logged and counted, and the pass
// moves on to the next one. State is committed before the pass starts, so
// nothing a listener does can leave it half-written.
// ============================================================================

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::core::error::{Result, StoreError};
use crate::core::types::ListenerId;

// =============================================================================
// PASS REPORT
// =============================================================================

/// Outcome of one notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Listeners that were invoked (successfully or not).
    pub notified: usize,
    /// Listeners that panicked.
    pub failed: usize,
    /// Listeners removed mid-pass before their turn came.
    pub skipped: usize,
}

impl PassReport {
    pub(crate) fn record(&mut self, ok: bool) {
        self.notified += 1;
        if !ok {
            self.failed += 1;
        }
    }

    pub fn into_result(self) -> Result<()> {
        if self.failed == 0 {
            Ok(())
        } else {
            Err(StoreError::ListenerPanicked {
                failed: self.failed,
                notified: self.notified,
            })
        }
    }
}

// =============================================================================
// ISOLATED INVOCATION
// =============================================================================

/// Run one listener, catching a panic. Returns `false` if it panicked.
pub(crate) fn invoke_isolated(id: ListenerId, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!(
                listener = %id,
                panic = %panic_message(payload.as_ref()),
                "listener panicked during notification"
            );
            false
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
