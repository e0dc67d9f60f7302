//! Player CRUD and stat increments.

use super::LocalStore;
use crate::error::{StorageError, StorageResult};
use rusqlite::params;
use tracing::debug;
use volley_types::{Player, PlayerId, now_millis};

impl LocalStore {
    /// Insert-or-replace a player by id. A missing update timestamp
    /// (zero or negative) defaults to the creation timestamp.
    pub fn upsert_player(&self, player: &Player) -> StorageResult<()> {
        let updated_at = if player.updated_at > 0 {
            player.updated_at
        } else {
            player.created_at
        };

        let conn = self.lock_conn();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO players (id, name, created_at, updated_at, win_count, loss_count)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                player.id.as_str(),
                player.name,
                player.created_at,
                updated_at,
                player.win_count,
                player.loss_count,
            ],
        )?;
        debug!(player_id = %player.id, "player upserted");
        Ok(())
    }

    /// Get a single player by id.
    pub fn get_player(&self, id: &PlayerId) -> StorageResult<Option<Player>> {
        let conn = self.lock_conn();
        let result = conn.query_row(
            "SELECT id, name, created_at, updated_at, win_count, loss_count FROM players WHERE id = ?",
            params![id.as_str()],
            row_to_player,
        );

        match result {
            Ok(player) => Ok(Some(player)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List players ordered for the leaderboard: win count descending,
    /// then most recently updated first.
    pub fn list_players(&self, limit: Option<usize>) -> StorageResult<Vec<Player>> {
        let conn = self.lock_conn();
        let mut sql = String::from(
            "SELECT id, name, created_at, updated_at, win_count, loss_count FROM players
             ORDER BY win_count DESC, updated_at DESC",
        );
        if let Some(lim) = limit {
            sql.push_str(&format!(" LIMIT {lim}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let players = stmt
            .query_map([], row_to_player)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(players)
    }

    /// Atomically add one win and bump the update timestamp. Fails with
    /// [`StorageError::PlayerNotFound`] if the id has no row.
    pub fn increment_win(&self, id: &PlayerId) -> StorageResult<()> {
        self.increment_stat(id, "win_count")
    }

    /// Atomically add one loss (local-only stat) and bump the update
    /// timestamp. Same not-found contract as [`LocalStore::increment_win`].
    pub fn increment_loss(&self, id: &PlayerId) -> StorageResult<()> {
        self.increment_stat(id, "loss_count")
    }

    fn increment_stat(&self, id: &PlayerId, column: &str) -> StorageResult<()> {
        let conn = self.lock_conn();
        let changed = conn.execute(
            &format!("UPDATE players SET {column} = {column} + 1, updated_at = ? WHERE id = ?"),
            params![now_millis(), id.as_str()],
        )?;
        if changed == 0 {
            return Err(StorageError::PlayerNotFound(id.to_string()));
        }
        debug!(player_id = %id, column, "stat incremented");
        Ok(())
    }
}

fn row_to_player(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: PlayerId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        win_count: row.get(4)?,
        loss_count: row.get(5)?,
    })
}
