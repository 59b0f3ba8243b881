//! Client error types.

use thiserror::Error;

use crate::retry::{RetryClass, Retryable};

/// Errors from a control-plane call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// Connection-level failure.
    #[error("{operation} failed: {reason}")]
    Transport { operation: String, reason: String },

    /// The call exceeded the client timeout.
    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout { operation: String, timeout_secs: u64 },

    /// The service answered with an error status.
    #[error("{operation} returned HTTP {status} {code}: {message}")]
    Service {
        operation: String,
        status: u16,
        code: String,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode {operation} response: {reason}")]
    Decode { operation: String, reason: String },
}

/// Result alias for client calls.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Returns true if the service signalled throttling.
    pub fn is_throttling(&self) -> bool {
        match self {
            Self::Service { status, code, .. } => {
                *status == 429 || code.contains("Throttling") || code.contains("TooManyRequests")
            }
            _ => false,
        }
    }
}

impl Retryable for ClientError {
    fn retry_class(&self) -> RetryClass {
        if self.is_throttling() {
            return RetryClass::Throttled;
        }
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => RetryClass::Transient,
            Self::Service { status, .. } if *status >= 500 => RetryClass::Transient,
            _ => RetryClass::Permanent,
        }
    }
}
