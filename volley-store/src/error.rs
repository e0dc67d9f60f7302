//! Error types for the local store.

use thiserror::Error;

/// All errors that can occur in local storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
