// ============================================================================
// spark-store - Reactivity Module
// Equality policy, listener registry, notification pass and diagnostics
// ============================================================================

pub mod diagnostics;
pub mod equality;
pub mod listeners;
pub mod notify;

pub use diagnostics::{
    DiagnosticEvent, DiagnosticSink, MemorySink, SharedSink, TracingSink, UpdateStatus,
};
pub use equality::{
    SameValue, always_equals, by_field, equals, never_equals, same_value, shallow_equals_slice,
};
pub use listeners::Unsubscribe;
pub use notify::PassReport;
