//! Error types for chat client operations.

use thiserror::Error;

/// Errors reported by a [`ChatClient`](crate::ChatClient) implementation.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The client is not connected.
    #[error("client is not connected")]
    NotConnected,

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The platform refused the request.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// Platform status code.
        status: u16,
        /// Message returned by the platform.
        message: String,
    },

    /// The platform is rate limiting the client itself.
    #[error("client is rate limited by the platform")]
    RateLimited,

    /// The target message or channel does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other client failure.
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Creates an [`Other`](Self::Other) error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
