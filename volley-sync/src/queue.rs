//! In-memory upload queue.
//!
//! Holds (kind, id) pairs whose remote write failed; survives only for the
//! process lifetime. The durable complement is the unsynced-flag scan in
//! the drain path, which covers items queued by a prior process.

use std::collections::VecDeque;
use std::sync::Mutex;
use volley_types::{MatchId, MatchKind};

/// One queued remote write. The record payload is re-read from the local
/// store at drain time so a drain always uploads fresh data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUpload {
    pub kind: MatchKind,
    pub id: MatchId,
}

/// FIFO of remote writes awaiting retry.
#[derive(Default)]
pub struct UploadQueue {
    items: Mutex<VecDeque<QueuedUpload>>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an upload. Re-enqueueing an item already present is a
    /// no-op: one successful retry covers every duplicate request.
    pub fn push(&self, item: QueuedUpload) {
        let mut items = self.lock();
        if !items.contains(&item) {
            items.push_back(item);
        }
    }

    /// Take everything currently queued, leaving the queue empty. Items
    /// that fail again are pushed back by the drain.
    pub fn take_all(&self) -> Vec<QueuedUpload> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueuedUpload>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
