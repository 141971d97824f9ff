// ============================================================================
// spark-store - Constants
// Diagnostic labels and logging targets
// ============================================================================

// =============================================================================
// DIAGNOSTIC STATUS LABELS
// =============================================================================

/// Emitted by a store before it notifies listeners.
pub const STATE_UPDATE: &str = "State Update";

/// Emitted by a selector on its first derivation after activation.
pub const INITIAL_RENDER: &str = "Initial Render";

/// Emitted by a selector when its derived value changed.
pub const NEW_SELECTED_STATE: &str = "New Selected State";

/// Emitted by a selector when the equality predicate judged no change.
pub const NO_NEW_SELECTED_STATE: &str = "No New Selected State";

// =============================================================================
// LOGGING
// =============================================================================

/// `tracing` target used by [`TracingSink`](crate::TracingSink).
pub const DIAGNOSTICS_TARGET: &str = "spark_store::diagnostics";

/// Listener ids start here; 0 is never handed out.
pub const FIRST_LISTENER_ID: u64 = 1;
