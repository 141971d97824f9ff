// ============================================================================
// spark-store - Errors
// ============================================================================

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A provider lookup ran with no store of the requested type in scope.
    #[error("no `Store<{type_name}>` is provided in the current scope; wrap the caller in `provide`")]
    MissingStore { type_name: &'static str },

    /// At least one listener panicked during a notification pass.
    /// The new state is committed and every other listener still ran.
    #[error("{failed} of {notified} listeners panicked during notification")]
    ListenerPanicked { failed: usize, notified: usize },
}

impl StoreError {
    #[must_use]
    pub fn missing<S: ?Sized>() -> Self {
        Self::MissingStore {
            type_name: std::any::type_name::<S>(),
        }
    }

    /// Whether the error is a wiring mistake rather than a runtime failure.
    #[must_use]
    pub fn is_missing_store(&self) -> bool {
        matches!(self, Self::MissingStore { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_names_the_state_type() {
        let err = StoreError::missing::<Vec<u8>>();
        assert!(err.is_missing_store());
        assert!(err.to_string().contains("Vec<u8>"));
    }

    #[test]
    fn listener_panicked_message() {
        let err = StoreError::ListenerPanicked {
            failed: 1,
            notified: 3,
        };
        assert!(!err.is_missing_store());
        assert_eq!(
            err.to_string(),
            "1 of 3 listeners panicked during notification"
        );
    }
}
