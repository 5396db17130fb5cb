//! Error types for the call-session orchestrator

use thiserror::Error;

use crate::provider::ProviderError;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by the orchestrator
#[derive(Debug, Error)]
pub enum SessionError {
    /// The trigger has no row for the current state; the state is unchanged
    #[error("No transition from {state} on {trigger}")]
    InvalidTransition {
        state: &'static str,
        trigger: &'static str,
    },

    /// An operation was called in a state where it makes no sense
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// A reconnect arrived after the session stopped asking for one
    #[error("Reconnect suppressed while {state}")]
    ReconnectSuppressed { state: &'static str },

    /// A required configuration value was never provided
    #[error("Voice session is not configured: missing {field}")]
    NotConfigured { field: &'static str },

    /// Configuration present but unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The voice-session provider failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl SessionError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error only means the call was ignored in the current state
    pub fn is_state_rejection(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidTransition { .. }
                | SessionError::InvalidState { .. }
                | SessionError::ReconnectSuppressed { .. }
        )
    }
}

impl From<talkbridge_infra_common::Error> for SessionError {
    fn from(err: talkbridge_infra_common::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}
