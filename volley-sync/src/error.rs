//! Sync engine error types.
//!
//! Only local storage faults cross the engine boundary: the local store is
//! the durability guarantee, so failing to write it is fatal to that
//! operation. Remote transport faults never surface here — they queue.

use thiserror::Error;
use volley_store::StorageError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can escape the reconciliation engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("local storage fault: {0}")]
    Storage(#[from] StorageError),

    #[error("sync worker not running")]
    WorkerNotRunning,
}
