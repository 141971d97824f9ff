// ============================================================================
// spark-store - Core Module
// Fundamental types, configuration, errors and provider context
// ============================================================================

pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{DebugConfig, RuntimeMode};
pub use context::provided_depth;
pub use error::{Result, StoreError};
pub use types::{DependentFn, DeriveFn, EqualsFn, ListenerFn, ListenerId};
