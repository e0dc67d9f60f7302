//! Reconciliation engine: local-first writes, queue-and-drain uploads,
//! merged reads.
//!
//! Ordering invariant: every write commits locally before any remote
//! traffic is attempted. The remote store is a best-effort replica; the
//! device store is the source of truth for availability, the remote store
//! for cross-device state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use volley_remote::codec::{
    self, FIELD_CREATED_AT, FIELD_OPPONENT_ID, FIELD_OWNER_ID, FIELD_WIN_COUNT,
    PLAYERS_COLLECTION, collection_for,
};
use volley_remote::{Filter, OrderBy, RemoteStore};
use volley_store::LocalStore;
use volley_types::{MatchId, MatchKind, MatchRecord, Player, PlayerId, SurvivalMatch, ThresholdMatch};

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::network::NetworkMonitor;
use crate::queue::{QueuedUpload, UploadQueue};

/// Point-in-time snapshot of the engine's backlog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub online: bool,
    pub queued_uploads: usize,
    pub pending_deletes: usize,
}

/// The reconciliation engine. Cheap to share behind an [`Arc`]; all
/// methods take `&self`.
pub struct SyncService {
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    network: Arc<dyn NetworkMonitor>,
    config: SyncConfig,
    queue: UploadQueue,
    draining: AtomicBool,
    last_scan: Mutex<Option<Instant>>,
}

impl SyncService {
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteStore>,
        network: Arc<dyn NetworkMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            local,
            remote,
            network,
            config,
            queue: UploadQueue::new(),
            draining: AtomicBool::new(false),
            last_scan: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn is_online(&self) -> bool {
        self.network.is_online()
    }

    pub fn subscribe_connectivity(&self) -> tokio::sync::watch::Receiver<bool> {
        self.network.subscribe()
    }

    pub fn pending_upload_count(&self) -> usize {
        self.queue.len()
    }

    pub fn status(&self) -> SyncResult<SyncStatus> {
        Ok(SyncStatus {
            online: self.network.is_online(),
            queued_uploads: self.queue.len(),
            pending_deletes: self.local.list_all_pending_deletes()?.len(),
        })
    }

    pub async fn save_threshold_match(&self, m: ThresholdMatch) -> SyncResult<()> {
        self.save_match(m.into()).await
    }

    pub async fn save_survival_match(&self, m: SurvivalMatch) -> SyncResult<()> {
        self.save_match(m.into()).await
    }

    /// Save a match record: commit locally, then attempt the remote write.
    ///
    /// Remote failure of any shape — offline, probe timeout, transport
    /// fault — queues the upload and still returns `Ok`. Only a local
    /// storage fault fails the save.
    pub async fn save_match(&self, mut record: MatchRecord) -> SyncResult<()> {
        record.set_synced(false);
        self.local.save_match(&record)?;

        let kind = record.kind();
        let id = record.id().clone();

        if !self.network.is_online() {
            debug!(match_id = %id, "offline, queueing upload");
            self.enqueue_upload(kind, id);
            // Every enqueue triggers a drain; this one no-ops while the
            // monitor still reads offline
            self.drain().await?;
            return Ok(());
        }

        // Bounded availability probe: a degraded backend must not hang the
        // save flow past the configured budget.
        let probe = Duration::from_secs(self.config.probe_timeout_secs);
        match timeout(probe, self.remote.ping()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(match_id = %id, error = %e, "remote probe failed, queueing upload");
                self.enqueue_upload(kind, id);
                self.drain().await?;
                return Ok(());
            }
            Err(_) => {
                warn!(match_id = %id, "remote probe timed out, queueing upload");
                self.enqueue_upload(kind, id);
                self.drain().await?;
                return Ok(());
            }
        }

        let doc = match &record {
            MatchRecord::Threshold(m) => codec::threshold_to_document(m),
            MatchRecord::Survival(m) => codec::survival_to_document(m),
        };
        match self
            .remote
            .create_with_id(collection_for(kind), id.as_str(), &doc)
            .await
        {
            // AlreadyExists is a retried write that already landed
            Ok(outcome) => {
                debug!(match_id = %id, ?outcome, "remote write confirmed");
                self.local.mark_synced(kind, &id)?;
            }
            Err(e) => {
                warn!(match_id = %id, error = %e, "remote write failed, queueing upload");
                self.enqueue_upload(kind, id);
                self.drain().await?;
            }
        }
        Ok(())
    }

    /// Push every queued upload, scan for unsynced rows, and retry pending
    /// deletes. Reentrant calls while a drain is running return
    /// immediately: the running drain covers them.
    pub async fn drain(&self) -> SyncResult<()> {
        if self.draining.swap(true, Ordering::SeqCst) {
            debug!("drain already in progress, skipping");
            return Ok(());
        }
        let result = self.drain_inner().await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain_inner(&self) -> SyncResult<()> {
        if !self.network.is_online() {
            debug!("offline, drain is a no-op");
            return Ok(());
        }

        let queued = self.queue.take_all();
        let queued_count = queued.len();
        let mut uploaded = 0usize;
        for item in queued {
            if self.try_upload(item.kind, &item.id).await? {
                uploaded += 1;
            } else {
                self.queue.push(item);
            }
        }

        // Full-table scans cover uploads queued by a previous process
        // lifetime. Throttled so connectivity flapping cannot hammer
        // storage; the in-memory queue above is never throttled.
        if self.should_scan() {
            for kind in [MatchKind::Threshold, MatchKind::Survival] {
                for record in self.local.list_unsynced(kind)? {
                    if !self.try_upload(kind, record.id()).await? {
                        self.enqueue_upload(kind, record.id().clone());
                    }
                }
            }
        }

        for pending in self.local.list_all_pending_deletes()? {
            let collection = collection_for(pending.kind);
            match self.remote.delete(collection, pending.match_id.as_str()).await {
                // NotFound is terminal too: already gone is gone
                Ok(outcome) => {
                    debug!(match_id = %pending.match_id, ?outcome, "remote delete confirmed");
                    self.local
                        .dequeue_pending_delete(pending.kind, &pending.match_id)?;
                }
                Err(e) => {
                    warn!(match_id = %pending.match_id, error = %e, "remote delete failed, staying queued");
                }
            }
        }

        if queued_count > 0 || uploaded > 0 {
            info!(uploaded, requeued = self.queue.len(), "drain pass finished");
        }
        Ok(())
    }

    /// Delete a match: remove the local row, then chase the remote copy.
    /// When the remote delete cannot be confirmed the id goes on the
    /// durable pending-delete queue for a later drain.
    pub async fn delete_match(&self, kind: MatchKind, id: &MatchId) -> SyncResult<()> {
        self.local.delete_match(kind, id)?;

        if !self.network.is_online() {
            debug!(match_id = %id, "offline, queueing remote delete");
            self.local.enqueue_pending_delete(kind, id)?;
            return Ok(());
        }

        match self.remote.delete(collection_for(kind), id.as_str()).await {
            Ok(outcome) => {
                debug!(match_id = %id, ?outcome, "remote delete confirmed");
                // Clear any entry left over from an earlier offline delete
                self.local.dequeue_pending_delete(kind, id)?;
            }
            Err(e) => {
                warn!(match_id = %id, error = %e, "remote delete failed, queueing");
                self.local.enqueue_pending_delete(kind, id)?;
            }
        }
        Ok(())
    }

    /// List matches of one kind, merging local and remote rows. Remote
    /// wins on id collision; ids awaiting deletion are suppressed; rows
    /// seen only remotely are cached locally as already-synced.
    pub async fn list_matches(
        &self,
        kind: MatchKind,
        owner: Option<&PlayerId>,
        limit: Option<usize>,
    ) -> SyncResult<Vec<MatchRecord>> {
        let local_rows = self.local.list_matches(kind, owner, None)?;
        let suppressed: HashSet<String> = self
            .local
            .list_pending_deletes(kind)?
            .into_iter()
            .map(|id| id.0)
            .collect();

        if !self.network.is_online() {
            return Ok(finish_merge(local_rows, &suppressed, limit));
        }

        let (filter, order_by) = match (kind, owner) {
            // Either-slot ownership needs a disjunction, and the backing
            // store cannot combine one with server-side ordering. Sort in
            // memory instead, and skip the server limit since it would
            // apply to an unordered result.
            (MatchKind::Threshold, Some(o)) => (
                Some(Filter::any_of(vec![
                    Filter::field_eq(FIELD_OWNER_ID, o.as_str()),
                    Filter::field_eq(FIELD_OPPONENT_ID, o.as_str()),
                ])),
                None,
            ),
            (MatchKind::Survival, Some(o)) => (
                Some(Filter::field_eq(FIELD_OWNER_ID, o.as_str())),
                Some(OrderBy::desc(FIELD_CREATED_AT)),
            ),
            (_, None) => (None, Some(OrderBy::desc(FIELD_CREATED_AT))),
        };
        let server_limit = if order_by.is_some() { limit } else { None };

        let remote_rows = match self
            .remote
            .run_query(
                collection_for(kind),
                filter.as_ref(),
                order_by.as_ref(),
                server_limit,
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(kind = %kind, error = %e, "remote query failed, serving local rows");
                return Ok(finish_merge(local_rows, &suppressed, limit));
            }
        };

        let mut merged: HashMap<String, MatchRecord> = local_rows
            .into_iter()
            .map(|r| (r.id().0.clone(), r))
            .collect();

        for (doc_id, doc) in remote_rows {
            if suppressed.contains(&doc_id) {
                continue;
            }
            let id = MatchId::new(doc_id);
            let decoded = match kind {
                MatchKind::Threshold => {
                    codec::threshold_from_document(&id, &doc).map(MatchRecord::Threshold)
                }
                MatchKind::Survival => {
                    codec::survival_from_document(&id, &doc).map(MatchRecord::Survival)
                }
            };
            let record = match decoded {
                Ok(record) => record,
                Err(e) => {
                    warn!(match_id = %id, error = %e, "skipping undecodable remote match");
                    continue;
                }
            };
            // Cache-fill: the document's existence is remote confirmation
            self.local.save_match(&record)?;
            self.local.mark_synced(kind, &id)?;
            merged.insert(id.0, record);
        }

        Ok(finish_merge(merged.into_values().collect(), &suppressed, limit))
    }

    /// Leaderboard read: remote profiles win on collision, but the
    /// local-only loss count is always preserved from the local row.
    pub async fn get_leaderboard(&self, limit: Option<usize>) -> SyncResult<Vec<Player>> {
        let local_players = self.local.list_players(None)?;

        if !self.network.is_online() {
            return Ok(finish_leaderboard(local_players, limit));
        }

        let remote_rows = match self
            .remote
            .run_query(
                PLAYERS_COLLECTION,
                None,
                Some(&OrderBy::desc(FIELD_WIN_COUNT)),
                limit,
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "remote leaderboard query failed, serving local rows");
                return Ok(finish_leaderboard(local_players, limit));
            }
        };

        let local_losses: HashMap<String, u32> = local_players
            .iter()
            .map(|p| (p.id.0.clone(), p.loss_count))
            .collect();
        let mut merged: HashMap<String, Player> = local_players
            .into_iter()
            .map(|p| (p.id.0.clone(), p))
            .collect();

        for (doc_id, doc) in remote_rows {
            let id = PlayerId::new(doc_id);
            let mut player = match codec::player_from_document(&id, &doc) {
                Ok(player) => player,
                Err(e) => {
                    warn!(player_id = %id, error = %e, "skipping undecodable remote player");
                    continue;
                }
            };
            player.loss_count = local_losses.get(id.as_str()).copied().unwrap_or(0);
            self.local.upsert_player(&player)?;
            merged.insert(id.0, player);
        }

        Ok(finish_leaderboard(merged.into_values().collect(), limit))
    }

    async fn try_upload(&self, kind: MatchKind, id: &MatchId) -> SyncResult<bool> {
        let Some(record) = self.local.get_match(kind, id)? else {
            // Deleted locally since it was queued; nothing left to upload
            debug!(match_id = %id, "queued match no longer exists locally");
            return Ok(true);
        };
        let doc = match &record {
            MatchRecord::Threshold(m) => codec::threshold_to_document(m),
            MatchRecord::Survival(m) => codec::survival_to_document(m),
        };
        match self
            .remote
            .create_with_id(collection_for(kind), id.as_str(), &doc)
            .await
        {
            Ok(outcome) => {
                debug!(match_id = %id, ?outcome, "queued upload confirmed");
                self.local.mark_synced(kind, id)?;
                Ok(true)
            }
            Err(e) => {
                warn!(match_id = %id, error = %e, "queued upload failed, will retry");
                Ok(false)
            }
        }
    }

    fn enqueue_upload(&self, kind: MatchKind, id: MatchId) {
        self.queue.push(QueuedUpload { kind, id });
    }

    fn should_scan(&self) -> bool {
        let min_interval = Duration::from_secs(self.config.scan_min_interval_secs);
        let mut last = self
            .last_scan
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *last {
            Some(at) if at.elapsed() < min_interval => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

fn finish_merge(
    mut rows: Vec<MatchRecord>,
    suppressed: &HashSet<String>,
    limit: Option<usize>,
) -> Vec<MatchRecord> {
    rows.retain(|r| !suppressed.contains(r.id().as_str()));
    rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    if let Some(lim) = limit {
        rows.truncate(lim);
    }
    rows
}

fn finish_leaderboard(mut players: Vec<Player>, limit: Option<usize>) -> Vec<Player> {
    players.sort_by(|a, b| {
        b.win_count
            .cmp(&a.win_count)
            .then(b.updated_at.cmp(&a.updated_at))
    });
    if let Some(lim) = limit {
        players.truncate(lim);
    }
    players
}
