use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::GistSyncError;
use crate::models::snippet::GistId;
use crate::models::sync_state::{SyncAttempt, SyncEntry};

/// Where mirror outcomes are recorded.
pub trait SyncLedger: Send + Sync {
    /// Append an attempt. Successful attempts also advance the gist's
    /// last-synced time to `attempt.finished_at`.
    fn record_attempt(&self, attempt: &SyncAttempt) -> Result<(), GistSyncError>;

    /// Last successful mirror time of a gist.
    fn last_synced(&self, id: &GistId) -> Result<Option<DateTime<Utc>>, GistSyncError>;

    /// All gists with a successful mirror, ordered by id.
    fn entries(&self) -> Result<Vec<SyncEntry>, GistSyncError>;

    /// Most recent attempts first, optionally for one gist.
    fn history(
        &self,
        id: Option<&GistId>,
        limit: usize,
    ) -> Result<Vec<SyncAttempt>, GistSyncError>;
}

/// Process-memory ledger. Lost on restart.
pub struct MemoryLedger {
    last_synced: Mutex<HashMap<GistId, DateTime<Utc>>>,
    attempts: Mutex<VecDeque<SyncAttempt>>,
    capacity: usize,
}

impl MemoryLedger {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Keep at most `capacity` attempts in history; the oldest are dropped.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            last_synced: Mutex::new(HashMap::new()),
            attempts: Mutex::new(VecDeque::new()),
            capacity,
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> GistSyncError {
    GistSyncError::Database("ledger lock poisoned".into())
}

impl SyncLedger for MemoryLedger {
    fn record_attempt(&self, attempt: &SyncAttempt) -> Result<(), GistSyncError> {
        if attempt.status.is_success() {
            self.last_synced
                .lock()
                .map_err(poisoned)?
                .insert(attempt.gist_id.clone(), attempt.finished_at);
        }

        let mut attempts = self.attempts.lock().map_err(poisoned)?;
        attempts.push_back(attempt.clone());
        while attempts.len() > self.capacity {
            attempts.pop_front();
        }
        Ok(())
    }

    fn last_synced(&self, id: &GistId) -> Result<Option<DateTime<Utc>>, GistSyncError> {
        Ok(self.last_synced.lock().map_err(poisoned)?.get(id).copied())
    }

    fn entries(&self) -> Result<Vec<SyncEntry>, GistSyncError> {
        let map = self.last_synced.lock().map_err(poisoned)?;
        let mut entries: Vec<SyncEntry> = map
            .iter()
            .map(|(id, at)| SyncEntry {
                gist_id: id.clone(),
                last_synced_at: *at,
            })
            .collect();
        entries.sort_by(|a, b| a.gist_id.cmp(&b.gist_id));
        Ok(entries)
    }

    fn history(
        &self,
        id: Option<&GistId>,
        limit: usize,
    ) -> Result<Vec<SyncAttempt>, GistSyncError> {
        let attempts = self.attempts.lock().map_err(poisoned)?;
        Ok(attempts
            .iter()
            .rev()
            .filter(|a| id.map_or(true, |id| &a.gist_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}
