//! Sync engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the reconciliation engine and its background worker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Bound on the remote availability probe during a save, in seconds.
    /// Keeps a degraded backend from hanging the save flow.
    pub probe_timeout_secs: u64,

    /// Minimum interval between full unsynced-table scans, in seconds.
    /// Drains of the in-memory queue are never throttled; this only keeps
    /// rapid connectivity flapping from hammering storage.
    pub scan_min_interval_secs: u64,

    /// Periodic fallback drain interval for the background worker,
    /// in seconds.
    pub fallback_drain_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 3,
            scan_min_interval_secs: 30,
            fallback_drain_interval_secs: 60,
        }
    }
}

impl SyncConfig {
    /// Config with throttling disabled, for tests that drain repeatedly.
    pub fn eager() -> Self {
        Self {
            probe_timeout_secs: 3,
            scan_min_interval_secs: 0,
            fallback_drain_interval_secs: 1,
        }
    }
}
