//! Local store — thread-safe SQLite wrapper with modular operations.

mod matches;
mod pending;
mod players;

use crate::error::StorageResult;
use crate::schema::initialize_schema;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Durable on-device store for players, match records, and the
/// pending-delete queue. Sole source of truth while offline.
///
/// Calls are synchronous from the caller's perspective; the connection is
/// shared behind a mutex so clones are cheap handles onto one database.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open (or create) the database at the given path. Schema creation is
    /// lazy and idempotent: every open re-runs it.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Acquire the connection lock, recovering from poison if a prior
    /// panic was caught while the lock was held.
    pub(crate) fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering from poisoned store mutex");
            poisoned.into_inner()
        })
    }
}
