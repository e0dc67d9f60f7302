//! DDL and schema helpers for the on-device database.

use crate::error::StorageResult;
use rusqlite::Connection;

/// Player profiles. `loss_count` is a local-only approximation and is
/// never reconciled with the remote store.
const PLAYERS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    win_count INTEGER NOT NULL DEFAULT 0,
    loss_count INTEGER NOT NULL DEFAULT 0
);
"#;

/// First-to-threshold match results. `synced` flips 0 -> 1 once a remote
/// copy is confirmed.
const THRESHOLD_MATCHES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS threshold_matches (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    opponent_id TEXT NOT NULL,
    owner_score INTEGER NOT NULL,
    opponent_score INTEGER NOT NULL,
    winner_id TEXT NOT NULL,
    elapsed_seconds INTEGER NOT NULL,
    target_threshold INTEGER,
    created_at INTEGER NOT NULL,
    played_online INTEGER NOT NULL DEFAULT 0,
    synced INTEGER NOT NULL DEFAULT 0
);
"#;

/// Survival match results.
const SURVIVAL_MATCHES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS survival_matches (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    verdict TEXT NOT NULL,
    survived_seconds INTEGER NOT NULL,
    target_seconds INTEGER,
    created_at INTEGER NOT NULL,
    played_online INTEGER NOT NULL DEFAULT 0,
    synced INTEGER NOT NULL DEFAULT 0
);
"#;

/// Deletions awaiting remote confirmation.
const PENDING_DELETES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS pending_deletes (
    score_id TEXT NOT NULL,
    score_type TEXT NOT NULL,
    enqueued_at INTEGER NOT NULL,
    PRIMARY KEY (score_id, score_type)
);
"#;

/// Columns added after the initial release. Databases created by current
/// builds already have them; older on-device files gain them here.
const MIGRATIONS: &[&str] = &[
    "ALTER TABLE players ADD COLUMN loss_count INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE threshold_matches ADD COLUMN played_online INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE survival_matches ADD COLUMN played_online INTEGER NOT NULL DEFAULT 0",
];

/// Initialize all tables. Idempotent; safe to call on every open.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(PLAYERS_DDL)?;
    conn.execute_batch(THRESHOLD_MATCHES_DDL)?;
    conn.execute_batch(SURVIVAL_MATCHES_DDL)?;
    conn.execute_batch(PENDING_DELETES_DDL)?;
    for migration in MIGRATIONS {
        add_column_if_missing(conn, migration)?;
    }
    Ok(())
}

/// Runs an `ALTER TABLE ... ADD COLUMN` statement, treating "the column is
/// already there" as success. SQLite has no `ADD COLUMN IF NOT EXISTS`, so
/// migration is attempt-and-ignore.
fn add_column_if_missing(conn: &Connection, sql: &str) -> StorageResult<()> {
    match conn.execute_batch(sql) {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("duplicate column name") => Ok(()),
        Err(e) => Err(e.into()),
    }
}
