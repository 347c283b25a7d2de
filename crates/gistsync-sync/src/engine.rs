use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use gistsync_core::error::GistSyncError;
use gistsync_core::ledger::SyncLedger;
use gistsync_core::models::snippet::Snippet;
use gistsync_host::SnippetSource;

use crate::mirror::{Mirror, MirrorResult};

/// Summary of one reconciliation cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub listed: usize,
    /// Per-gist results in listing order.
    pub results: Vec<MirrorResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    pub fn left_behind(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.clone_state.left_behind())
            .count()
    }
}

/// Runs full reconciliation cycles: list every gist, mirror each one.
pub struct Reconciler {
    source: Arc<dyn SnippetSource>,
    mirror: Arc<Mirror>,
    ledger: Arc<dyn SyncLedger>,
    slots: u32,
    permits: Arc<Semaphore>,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn SnippetSource>,
        mirror: Arc<Mirror>,
        ledger: Arc<dyn SyncLedger>,
    ) -> Self {
        Self {
            source,
            mirror,
            ledger,
            slots: 1,
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Mirror up to `concurrency` gists at once. 1 is strictly sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.slots = u32::try_from(concurrency.max(1)).unwrap_or(u32::MAX);
        self.permits = Arc::new(Semaphore::new(self.slots as usize));
        self
    }

    /// Resolves once no mirror task is running. Tasks outlive an abandoned
    /// cycle, so shutdown waits here before exiting.
    pub async fn wait_idle(&self) {
        let _ = self.permits.acquire_many(self.slots).await;
    }

    /// One cycle. Fails only when the listing fails, in which case no gist
    /// is mirrored and nothing is recorded; per-gist failures are logged and
    /// the batch continues.
    pub async fn run_once(&self) -> Result<CycleReport, GistSyncError> {
        let started_at = Utc::now();
        tracing::info!("starting sync");

        let snippets = match self.source.list_all().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, kind = %e.kind(), "failed to list gists");
                return Err(e);
            }
        };
        let listed = snippets.len();
        tracing::info!(count = listed, "found gists to sync");

        let snippets = dedup_by_id(snippets);
        let results = self.mirror_all(snippets).await;

        let report = CycleReport {
            listed,
            results,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            left_behind = report.left_behind(),
            "sync completed"
        );
        Ok(report)
    }

    /// Each gist runs as a blocking task behind the semaphore and records its
    /// own attempt as soon as it finishes; results come back in submission
    /// order.
    async fn mirror_all(&self, snippets: Vec<Snippet>) -> Vec<MirrorResult> {
        let mut handles = Vec::with_capacity(snippets.len());

        for snippet in snippets {
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let mirror = self.mirror.clone();
            let ledger = self.ledger.clone();
            let id = snippet.id.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let result = mirror.mirror_snippet(&snippet);
                if let Err(e) = ledger.record_attempt(&result.attempt) {
                    tracing::warn!(gist_id = %result.gist_id(), error = %e, "failed to record sync attempt");
                }
                result
            });
            handles.push((id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!(gist_id = %id, error = %e, "mirror task aborted"),
            }
        }
        results
    }
}

/// Keep the first occurrence of each id so no two tasks share a working clone.
fn dedup_by_id(snippets: Vec<Snippet>) -> Vec<Snippet> {
    let mut seen = HashSet::new();
    snippets
        .into_iter()
        .filter(|s| {
            let fresh = seen.insert(s.id.clone());
            if !fresh {
                tracing::warn!(gist_id = %s.id, "duplicate gist in listing, skipping");
            }
            fresh
        })
        .collect()
}
