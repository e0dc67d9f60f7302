//! Offline-first reconciliation between the on-device store and the
//! remote document store.
//!
//! Writes commit locally first and replicate best-effort; reads merge
//! both sides with the remote copy winning on id collisions. Failed
//! remote writes queue and drain on connectivity regain, on a periodic
//! fallback timer, and at startup.

pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod profile;
pub mod queue;
pub mod worker;

pub use config::SyncConfig;
pub use engine::{SyncService, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use network::{NetworkMonitor, WatchNetworkMonitor};
pub use profile::{ProfileService, RemoteWrite};
pub use queue::{QueuedUpload, UploadQueue};
pub use worker::{SyncHandle, SyncWorker, create_sync_worker};
