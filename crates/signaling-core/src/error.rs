//! Error types for the signaling client

use thiserror::Error;

/// Result type for signaling operations
pub type SignalingResult<T> = Result<T, SignalingError>;

/// Errors that can occur while talking to the signaling service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// A required configuration value was never provided
    #[error("Signaling is not configured: missing {field}")]
    NotConfigured { field: &'static str },

    /// A configuration value is present but unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The request never produced an HTTP response
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A body could not be encoded or a response decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A voip-block schedule item is malformed
    #[error("Invalid schedule: {reason}")]
    InvalidSchedule { reason: String },
}

impl SignalingError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a schedule validation error
    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for SignalingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

impl From<talkbridge_infra_common::Error> for SignalingError {
    fn from(err: talkbridge_infra_common::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}
