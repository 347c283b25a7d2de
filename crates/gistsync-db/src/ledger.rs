use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use gistsync_core::error::GistSyncError;
use gistsync_core::ledger::SyncLedger;
use gistsync_core::models::snippet::GistId;
use gistsync_core::models::sync_state::{SyncAttempt, SyncEntry};

use crate::ops;

/// SQLite-backed ledger that survives restarts.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

fn db_err(e: impl std::fmt::Display) -> GistSyncError {
    GistSyncError::Database(e.to_string())
}

impl SqliteLedger {
    pub fn open(path: &Path) -> Result<Self, GistSyncError> {
        let conn = crate::open_db(path).map_err(db_err)?;
        tracing::info!(path = %path.display(), "opened sync-state database");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, GistSyncError> {
        let conn = crate::open_memory_db().map_err(db_err)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> anyhow::Result<T>,
    ) -> Result<T, GistSyncError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| GistSyncError::Database("connection lock poisoned".into()))?;
        f(&conn).map_err(db_err)
    }
}

impl SyncLedger for SqliteLedger {
    fn record_attempt(&self, attempt: &SyncAttempt) -> Result<(), GistSyncError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            ops::insert_sync_attempt(&tx, attempt)?;
            if attempt.status.is_success() {
                ops::upsert_last_synced(&tx, &attempt.gist_id, &attempt.finished_at)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn last_synced(&self, id: &GistId) -> Result<Option<DateTime<Utc>>, GistSyncError> {
        self.with_conn(|conn| ops::get_last_synced(conn, id))
    }

    fn entries(&self) -> Result<Vec<SyncEntry>, GistSyncError> {
        self.with_conn(ops::list_sync_state)
    }

    fn history(
        &self,
        id: Option<&GistId>,
        limit: usize,
    ) -> Result<Vec<SyncAttempt>, GistSyncError> {
        self.with_conn(|conn| ops::list_sync_history(conn, id, limit))
    }
}
