// ============================================================================
// spark-store - Configuration
// Runtime mode and per-store / per-selector debug configuration
// ============================================================================

use std::fmt;

// =============================================================================
// RUNTIME MODE
// =============================================================================

/// Deployment mode injected into stores and selectors at construction.
///
/// Diagnostics are only ever emitted in [`RuntimeMode::Development`],
/// regardless of what an individual [`DebugConfig`] asks for. The core never
/// reads the process environment to decide this; callers pass the mode in
/// (or take the build-profile default from [`RuntimeMode::from_build`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeMode {
    Development,
    Production,
}

impl RuntimeMode {
    /// `Development` for debug builds, `Production` for release builds.
    #[must_use]
    pub const fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    #[must_use]
    pub const fn allows_diagnostics(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl Default for RuntimeMode {
    fn default() -> Self {
        Self::from_build()
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

// =============================================================================
// DEBUG CONFIG
// =============================================================================

/// Diagnostic settings attached to a store or selector.
///
/// Absence (`None` in the options) and `enabled: false` both mean no events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    /// Tag carried by every emitted event.
    pub name: String,
    pub enabled: bool,
}

impl DebugConfig {
    /// An enabled config with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// A named config that emits nothing.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }
}
