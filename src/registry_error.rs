use thiserror::Error;

use crate::StateId;

/// Error returned by a notification callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Hard failures of registry operations.
///
/// Absent or occupied slots are never errors; those outcomes are reported as `bool`
/// or `Option`.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The value offered for staging is not a recognized error.
    #[error("{reason}")]
    ValidationFailed { reason: &'static str },

    /// The notification callback failed after the error was stored.
    #[error("callback failed for state {state}: {source}")]
    Callback {
        state: StateId,
        #[source]
        source: CallbackError,
    },
}

impl RegistryError {
    pub(crate) fn not_an_error() -> Self {
        RegistryError::ValidationFailed {
            reason: "an error kind or error instance is required",
        }
    }
}
