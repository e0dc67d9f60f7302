//! Remote store error types.

use thiserror::Error;

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur talking to the remote document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("document decode failed: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RemoteError {
    /// Transient faults (timeouts, refused connections, non-2xx responses)
    /// are always recoverable by queueing and retrying later. Decode and
    /// configuration faults are not — retrying the same payload cannot
    /// succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Http(_) | RemoteError::Api(_) | RemoteError::Unavailable(_)
        )
    }
}
