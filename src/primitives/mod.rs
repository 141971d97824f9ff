// ============================================================================
// spark-store - Primitives Module
// Store, selector binding and provider scope
// ============================================================================

pub mod provider;
pub mod selector;
pub mod store;

pub use provider::{StoreSetter, provide, use_selector, use_selector_with, use_setter, use_store};
pub use selector::{SelectOptions, Selector, select_snapshot};
pub use store::{Store, StoreBuilder};
