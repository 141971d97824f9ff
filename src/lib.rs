// ============================================================================
// spark-store - Selective-Observation State Store for Rust
// ============================================================================
//
// One shared state cell, many observers. Each observer selects a slice of
// the state and is only notified when that slice actually changes under its
// equality policy. Single-threaded handles (`Rc`) by default; thread-safe
// `SyncStore` / `SyncSelector` behind the `sync` feature.
// ============================================================================

pub mod core;
pub mod primitives;
pub mod reactivity;
#[cfg(feature = "sync")]
pub mod sync;

mod macros;

// Re-export core items at crate root
pub use core::constants;
pub use core::{
    DebugConfig, DependentFn, DeriveFn, EqualsFn, ListenerFn, ListenerId, Result, RuntimeMode,
    StoreError, provided_depth,
};

// Re-export primitives at crate root
pub use primitives::{
    SelectOptions, Selector, Store, StoreBuilder, StoreSetter, provide, select_snapshot,
    use_selector, use_selector_with, use_setter, use_store,
};

// Re-export reactivity
pub use reactivity::{
    DiagnosticEvent, DiagnosticSink, MemorySink, PassReport, SameValue, SharedSink, TracingSink,
    Unsubscribe, UpdateStatus, always_equals, by_field, equals, never_equals, same_value,
    shallow_equals_slice,
};

#[cfg(feature = "sync")]
pub use sync::{SyncSelectOptions, SyncSelector, SyncStore, SyncStoreBuilder, SyncUnsubscribe};

// =============================================================================
// TESTS
// =============================================================================
