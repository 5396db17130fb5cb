//! Error types for the call client

use thiserror::Error;

use talkbridge_session_core::{ProviderError, SessionError};
use talkbridge_signaling_core::SignalingError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the call client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid client configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The call-session state machine refused an operation
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The voice provider failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A signaling request failed
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    /// Task or infrastructure failure
    #[error(transparent)]
    Infra(#[from] talkbridge_infra_common::Error),
}

impl ClientError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
