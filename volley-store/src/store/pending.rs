//! Pending-delete queue: deletions waiting for remote confirmation.

use super::LocalStore;
use crate::error::StorageResult;
use rusqlite::params;
use tracing::debug;
use volley_types::{MatchId, MatchKind, PendingDelete, now_millis};

impl LocalStore {
    /// Record that a match still needs a remote delete. Re-enqueueing the
    /// same (id, kind) pair refreshes the timestamp rather than erroring.
    pub fn enqueue_pending_delete(&self, kind: MatchKind, id: &MatchId) -> StorageResult<()> {
        let conn = self.lock_conn();
        conn.execute(
            "INSERT OR REPLACE INTO pending_deletes (score_id, score_type, enqueued_at) VALUES (?, ?, ?)",
            params![id.as_str(), kind.as_str(), now_millis()],
        )?;
        debug!(match_id = %id, kind = %kind, "pending delete enqueued");
        Ok(())
    }

    /// Remove a queue entry after the remote delete is confirmed.
    pub fn dequeue_pending_delete(&self, kind: MatchKind, id: &MatchId) -> StorageResult<()> {
        let conn = self.lock_conn();
        conn.execute(
            "DELETE FROM pending_deletes WHERE score_id = ? AND score_type = ?",
            params![id.as_str(), kind.as_str()],
        )?;
        debug!(match_id = %id, kind = %kind, "pending delete dequeued");
        Ok(())
    }

    /// Ids of one kind still awaiting a remote delete.
    pub fn list_pending_deletes(&self, kind: MatchKind) -> StorageResult<Vec<MatchId>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT score_id FROM pending_deletes WHERE score_type = ? ORDER BY enqueued_at",
        )?;
        let ids = stmt
            .query_map(params![kind.as_str()], |row| {
                Ok(MatchId::new(row.get::<_, String>(0)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Every queued deletion across both kinds, oldest first. Used by the
    /// drain pass.
    pub fn list_all_pending_deletes(&self) -> StorageResult<Vec<PendingDelete>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT score_id, score_type, enqueued_at FROM pending_deletes ORDER BY enqueued_at",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, kind, enqueued_at)| {
                // Unknown score_type values are skipped rather than failing
                // the whole drain
                MatchKind::parse(&kind).map(|kind| PendingDelete {
                    match_id: MatchId::new(id),
                    kind,
                    enqueued_at,
                })
            })
            .collect())
    }
}
