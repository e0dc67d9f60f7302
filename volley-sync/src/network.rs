//! Connectivity monitoring seam.
//!
//! The platform layer (mobile shell) owns the real reachability plumbing;
//! the engine only needs the current state and a change subscription.

use tokio::sync::watch;

/// Exposes current connectivity and a change-notification subscription.
pub trait NetworkMonitor: Send + Sync {
    /// Current best-knowledge connectivity. May be stale the moment it is
    /// read; the engine treats it as a hint, never a guarantee.
    fn is_online(&self) -> bool;

    /// Subscribe to connectivity transitions.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Watch-channel backed monitor. The platform layer calls
/// [`WatchNetworkMonitor::set_online`] from its reachability callback;
/// tests drive it directly.
pub struct WatchNetworkMonitor {
    tx: watch::Sender<bool>,
}

impl WatchNetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Publish a connectivity transition. Publishing the current state
    /// again is a no-op for subscribers.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|state| {
            let changed = *state != online;
            *state = online;
            changed
        });
    }
}

impl NetworkMonitor for WatchNetworkMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
