//! Match record CRUD and sync-flag management for both match kinds.

use super::LocalStore;
use crate::error::{StorageError, StorageResult};
use rusqlite::params;
use tracing::debug;
use volley_types::{
    MatchId, MatchKind, MatchRecord, PlayerId, SurvivalMatch, ThresholdMatch, Verdict,
};

impl LocalStore {
    /// Insert-or-replace a match record. The sync flag is forced to 0:
    /// new or rewritten matches always start unsynced and only
    /// [`LocalStore::mark_synced`] flips them after a confirmed remote write.
    pub fn save_match(&self, record: &MatchRecord) -> StorageResult<()> {
        let conn = self.lock_conn();
        match record {
            MatchRecord::Threshold(m) => {
                conn.execute(
                    r#"
                    INSERT OR REPLACE INTO threshold_matches (
                        id, owner_id, opponent_id, owner_score, opponent_score,
                        winner_id, elapsed_seconds, target_threshold, created_at,
                        played_online, synced
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
                    "#,
                    params![
                        m.id.as_str(),
                        m.owner_id.as_str(),
                        m.opponent_id.as_str(),
                        m.owner_score,
                        m.opponent_score,
                        m.winner_id.as_str(),
                        m.elapsed_seconds,
                        m.target_threshold,
                        m.created_at,
                        m.played_online,
                    ],
                )?;
            }
            MatchRecord::Survival(m) => {
                conn.execute(
                    r#"
                    INSERT OR REPLACE INTO survival_matches (
                        id, owner_id, verdict, survived_seconds, target_seconds,
                        created_at, played_online, synced
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, 0)
                    "#,
                    params![
                        m.id.as_str(),
                        m.owner_id.as_str(),
                        m.verdict.as_str(),
                        m.survived_seconds,
                        m.target_seconds,
                        m.created_at,
                        m.played_online,
                    ],
                )?;
            }
        }
        debug!(match_id = %record.id(), kind = %record.kind(), "match saved");
        Ok(())
    }

    /// Get a single match by id.
    pub fn get_match(&self, kind: MatchKind, id: &MatchId) -> StorageResult<Option<MatchRecord>> {
        let conn = self.lock_conn();
        match kind {
            MatchKind::Threshold => {
                let result = conn.query_row(
                    &format!("{THRESHOLD_SELECT} WHERE id = ?"),
                    params![id.as_str()],
                    row_to_threshold,
                );
                match result {
                    Ok(m) => Ok(Some(MatchRecord::Threshold(m))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            MatchKind::Survival => {
                let result = conn.query_row(
                    &format!("{SURVIVAL_SELECT} WHERE id = ?"),
                    params![id.as_str()],
                    row_to_survival_raw,
                );
                match result {
                    Ok(raw) => Ok(Some(MatchRecord::Survival(survival_from_raw(raw)?))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// List matches of one kind, newest first, limit applied after
    /// ordering. For threshold matches an owner filter matches rows where
    /// the id appears in either player slot, so a record is visible to
    /// both participants.
    pub fn list_matches(
        &self,
        kind: MatchKind,
        owner: Option<&PlayerId>,
        limit: Option<usize>,
    ) -> StorageResult<Vec<MatchRecord>> {
        let conn = self.lock_conn();
        match kind {
            MatchKind::Threshold => {
                let mut sql = THRESHOLD_SELECT.to_string();
                if owner.is_some() {
                    sql.push_str(" WHERE owner_id = ?1 OR opponent_id = ?1");
                }
                sql.push_str(" ORDER BY created_at DESC");
                if let Some(lim) = limit {
                    sql.push_str(&format!(" LIMIT {lim}"));
                }

                let mut stmt = conn.prepare(&sql)?;
                let rows = match owner {
                    Some(o) => stmt.query_map(params![o.as_str()], row_to_threshold)?,
                    None => stmt.query_map([], row_to_threshold)?,
                };
                let matches = rows
                    .map(|r| r.map(MatchRecord::Threshold))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(matches)
            }
            MatchKind::Survival => {
                let mut sql = SURVIVAL_SELECT.to_string();
                if owner.is_some() {
                    sql.push_str(" WHERE owner_id = ?1");
                }
                sql.push_str(" ORDER BY created_at DESC");
                if let Some(lim) = limit {
                    sql.push_str(&format!(" LIMIT {lim}"));
                }

                let mut stmt = conn.prepare(&sql)?;
                let raw_rows = match owner {
                    Some(o) => stmt.query_map(params![o.as_str()], row_to_survival_raw)?,
                    None => stmt.query_map([], row_to_survival_raw)?,
                }
                .collect::<Result<Vec<_>, _>>()?;

                raw_rows
                    .into_iter()
                    .map(|raw| survival_from_raw(raw).map(MatchRecord::Survival))
                    .collect()
            }
        }
    }

    /// Flip the sync flag to 1 after a confirmed remote write.
    pub fn mark_synced(&self, kind: MatchKind, id: &MatchId) -> StorageResult<()> {
        let conn = self.lock_conn();
        conn.execute(
            &format!("UPDATE {} SET synced = 1 WHERE id = ?", table_for(kind)),
            params![id.as_str()],
        )?;
        debug!(match_id = %id, kind = %kind, "match marked synced");
        Ok(())
    }

    /// All rows of one kind whose remote copy is not yet confirmed.
    /// Covers items queued in a prior process lifetime.
    pub fn list_unsynced(&self, kind: MatchKind) -> StorageResult<Vec<MatchRecord>> {
        let conn = self.lock_conn();
        match kind {
            MatchKind::Threshold => {
                let mut stmt =
                    conn.prepare(&format!("{THRESHOLD_SELECT} WHERE synced = 0"))?;
                let matches = stmt
                    .query_map([], row_to_threshold)?
                    .map(|r| r.map(MatchRecord::Threshold))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(matches)
            }
            MatchKind::Survival => {
                let mut stmt = conn.prepare(&format!("{SURVIVAL_SELECT} WHERE synced = 0"))?;
                let raw_rows = stmt
                    .query_map([], row_to_survival_raw)?
                    .collect::<Result<Vec<_>, _>>()?;
                raw_rows
                    .into_iter()
                    .map(|raw| survival_from_raw(raw).map(MatchRecord::Survival))
                    .collect()
            }
        }
    }

    /// Delete a match row. Deleting an absent id is a no-op.
    pub fn delete_match(&self, kind: MatchKind, id: &MatchId) -> StorageResult<()> {
        let conn = self.lock_conn();
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", table_for(kind)),
            params![id.as_str()],
        )?;
        debug!(match_id = %id, kind = %kind, "match deleted");
        Ok(())
    }
}

const THRESHOLD_SELECT: &str = "SELECT id, owner_id, opponent_id, owner_score, opponent_score, \
     winner_id, elapsed_seconds, target_threshold, created_at, played_online, synced \
     FROM threshold_matches";

const SURVIVAL_SELECT: &str = "SELECT id, owner_id, verdict, survived_seconds, target_seconds, \
     created_at, played_online, synced FROM survival_matches";

fn table_for(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Threshold => "threshold_matches",
        MatchKind::Survival => "survival_matches",
    }
}

fn row_to_threshold(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThresholdMatch> {
    Ok(ThresholdMatch {
        id: MatchId::new(row.get::<_, String>(0)?),
        owner_id: PlayerId::new(row.get::<_, String>(1)?),
        opponent_id: PlayerId::new(row.get::<_, String>(2)?),
        owner_score: row.get(3)?,
        opponent_score: row.get(4)?,
        winner_id: PlayerId::new(row.get::<_, String>(5)?),
        elapsed_seconds: row.get(6)?,
        target_threshold: row.get(7)?,
        created_at: row.get(8)?,
        played_online: row.get(9)?,
        synced: row.get(10)?,
    })
}

type SurvivalRaw = (String, String, String, u32, Option<u32>, i64, bool, bool);

fn row_to_survival_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<SurvivalRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn survival_from_raw(raw: SurvivalRaw) -> Result<SurvivalMatch, StorageError> {
    let (id, owner_id, verdict, survived, target, created_at, played_online, synced) = raw;
    let verdict = Verdict::parse(&verdict)
        .ok_or_else(|| StorageError::InvalidRow(format!("unknown verdict '{verdict}' for {id}")))?;
    Ok(SurvivalMatch {
        id: MatchId::new(id),
        owner_id: PlayerId::new(owner_id),
        verdict,
        survived_seconds: survived,
        target_seconds: target,
        created_at,
        played_online,
        synced,
    })
}
