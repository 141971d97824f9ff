// ============================================================================
// spark-store - Thread-Safe Variants (feature = "sync")
// SyncStore and SyncSelector with the same semantics as Store and Selector
// ============================================================================

mod gate;
pub mod listeners;
pub mod selector;
pub mod store;

pub use listeners::SyncUnsubscribe;
pub use selector::{SyncSelectOptions, SyncSelector};
pub use store::{SyncStore, SyncStoreBuilder};
