use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gistsync_core::config::{GistSyncConfig, Secret};
use gistsync_core::error::GistSyncError;
use gistsync_core::ledger::SyncLedger;
use gistsync_core::models::snippet::{GistId, Snippet};
use gistsync_core::models::sync_state::{SyncAttempt, SyncStatus};
use gistsync_db::{open_memory_db, ops, SqliteLedger};
use gistsync_host::{OpengistTarget, SnippetSource};
use gistsync_sync::git_ops;
use gistsync_sync::{GitCli, Mirror, MirrorOptions, Reconciler};
use tempfile::TempDir;

struct StaticSource(Vec<Snippet>);

#[async_trait]
impl SnippetSource for StaticSource {
    async fn list_all(&self) -> Result<Vec<Snippet>, GistSyncError> {
        Ok(self.0.clone())
    }

    async fn get(&self, id: &GistId) -> Result<Option<Snippet>, GistSyncError> {
        Ok(self.0.iter().find(|s| &s.id == id).cloned())
    }

    async fn validate_credentials(&self) -> Result<bool, GistSyncError> {
        Ok(true)
    }
}

fn git(cwd: &Path, args: &[&str]) {
    let out = Command::new("git")
        .args(["-c", "user.name=gist-sync", "-c", "user.email=gist-sync@example.com"])
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("git not available");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
}

/// A source gist with one commit and an empty bare destination for it.
fn seed_gist(root: &Path, id: &str) -> Snippet {
    let src = root.join("github").join(id);
    std::fs::create_dir_all(&src).unwrap();
    git(&src, &["init", "-q"]);
    std::fs::write(src.join("notes.md"), format!("# {id}\n")).unwrap();
    git(&src, &["add", "."]);
    git(&src, &["commit", "-q", "-m", "initial"]);

    let dest = root.join("opengist").join("mirror").join(id);
    std::fs::create_dir_all(&dest).unwrap();
    git(&dest, &["init", "-q", "--bare"]);

    Snippet::new(id, format!("file://{}", src.display()))
}

fn mirror_into(root: &Path) -> Arc<Mirror> {
    let mut options = MirrorOptions::new(root.join("work"));
    options.settle_delay = Duration::ZERO;
    Arc::new(Mirror::new(
        Arc::new(GitCli),
        OpengistTarget::new(
            &format!("file://{}", root.join("opengist").display()),
            "mirror",
            Secret::new("unused"),
        ),
        options,
    ))
}

#[test]
fn test_config_from_lookup() {
    let vars: HashMap<&str, &str> = [
        ("GITHUB_TOKEN", "ghp_test"),
        ("GITHUB_USERNAME", "octocat"),
        ("OPENGIST_URL", "https://gists.example.com/"),
        ("OPENGIST_USERNAME", "mirror"),
        ("OPENGIST_TOKEN", "og_test"),
        ("SYNC_INTERVAL_MINUTES", "5"),
    ]
    .into_iter()
    .collect();

    let config =
        GistSyncConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
    assert_eq!(config.github_username, "octocat");
    assert_eq!(config.opengist_url, "https://gists.example.com");
    assert_eq!(config.sync_interval(), Duration::from_secs(300));
    assert_eq!(config.sync_concurrency, 1);

    let target = OpengistTarget::from_config(&config);
    assert_eq!(
        target.remote_url(&GistId::new("abc123")),
        "https://gists.example.com/mirror/abc123"
    );

    let shown = config.to_toml().unwrap();
    assert!(!shown.contains("ghp_test"));
    assert!(!shown.contains("og_test"));
}

#[test]
fn test_missing_token_is_config_error() {
    let err = GistSyncConfig::from_lookup(|key| match key {
        "GITHUB_USERNAME" => Some("octocat".to_string()),
        _ => None,
    })
    .unwrap_err();
    assert!(matches!(err, GistSyncError::Config { .. }));
}

#[test]
fn test_sync_state_in_memory() {
    let conn = open_memory_db().unwrap();
    let id = GistId::new("abc123");

    let mut failed = SyncAttempt::new(id.clone());
    failed.status = SyncStatus::Failed;
    failed.error = Some("push rejected".to_string());
    ops::insert_sync_attempt(&conn, &failed).unwrap();
    assert!(ops::get_last_synced(&conn, &id).unwrap().is_none());

    let ok = SyncAttempt::new(id.clone());
    ops::insert_sync_attempt(&conn, &ok).unwrap();
    ops::upsert_last_synced(&conn, &id, &ok.finished_at).unwrap();

    assert_eq!(ops::get_last_synced(&conn, &id).unwrap(), Some(ok.finished_at));
    assert_eq!(ops::list_sync_state(&conn).unwrap().len(), 1);
    assert_eq!(ops::list_sync_history(&conn, Some(&id), 10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_full_cycle_against_local_repos() {
    let dir = TempDir::new().unwrap();
    let snippets = vec![seed_gist(dir.path(), "aaa"), seed_gist(dir.path(), "bbb")];
    // No bare repo for this one, so its push fails.
    let mut missing = seed_gist(dir.path(), "ccc");
    std::fs::remove_dir_all(dir.path().join("opengist").join("mirror").join("ccc")).unwrap();
    missing.description = "destination missing".to_string();

    let mut all = snippets.clone();
    all.insert(1, missing);

    let ledger = Arc::new(SqliteLedger::open(&dir.path().join("state").join("sync.db")).unwrap());
    let reconciler = Reconciler::new(
        Arc::new(StaticSource(all)),
        mirror_into(dir.path()),
        ledger.clone(),
    );

    let report = reconciler.run_once().await.unwrap();
    assert_eq!(report.listed, 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.left_behind(), 0);
    assert!(std::fs::read_dir(dir.path().join("work")).unwrap().next().is_none());

    for id in ["aaa", "bbb"] {
        let src = dir.path().join("github").join(id);
        let dest = dir.path().join("opengist").join("mirror").join(id);
        assert_eq!(
            git_ops::rev_parse(&src, "HEAD").unwrap(),
            git_ops::rev_parse(&dest, "HEAD").unwrap()
        );
        assert!(ledger.last_synced(&GistId::new(id)).unwrap().is_some());
    }
    assert!(ledger.last_synced(&GistId::new("ccc")).unwrap().is_none());
    assert_eq!(ledger.history(None, 10).unwrap().len(), 3);

    // Second cycle finds nothing new but still refreshes the sync time.
    let before = ledger.last_synced(&GistId::new("aaa")).unwrap();
    let report = reconciler.run_once().await.unwrap();
    assert_eq!(report.succeeded(), 2);
    assert!(report
        .results
        .iter()
        .filter(|r| r.is_success())
        .all(|r| r.attempt.status == SyncStatus::UpToDate));
    assert!(ledger.last_synced(&GistId::new("aaa")).unwrap() >= before);
}

#[test]
fn test_status_strings() {
    for status in [SyncStatus::Success, SyncStatus::UpToDate, SyncStatus::Failed] {
        let parsed: SyncStatus = status.to_string().parse().unwrap();
        assert_eq!(parsed, status);
    }
}
