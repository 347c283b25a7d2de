pub mod check;
pub mod config;
pub mod history;
pub mod mirror;
pub mod run;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use gistsync_core::config::GistSyncConfig;
use gistsync_core::ledger::{MemoryLedger, SyncLedger};
use gistsync_db::SqliteLedger;
use gistsync_host::{GitHubGists, OpengistTarget, SnippetSource};
use gistsync_sync::{GitCli, Mirror, MirrorOptions, Reconciler};

#[derive(Subcommand)]
pub enum Command {
    /// Sync now, then again every SYNC_INTERVAL_MINUTES until interrupted
    Run(run::RunArgs),
    /// Run a single sync cycle and exit
    Once(run::RunArgs),
    /// Mirror one gist by id
    Mirror(mirror::MirrorArgs),
    /// Show the last successful sync of every gist
    Status(status::StatusArgs),
    /// Show recorded sync attempts
    History(history::HistoryArgs),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
    /// Check that the GitHub token is accepted
    Check,
}

impl Default for Command {
    fn default() -> Self {
        Command::Run(run::RunArgs::default())
    }
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Run(args) => run::daemon(args).await,
        Command::Once(args) => run::once(args).await,
        Command::Mirror(args) => mirror::run(args).await,
        Command::Status(args) => status::run(args),
        Command::History(args) => history::run(args),
        Command::Config { action } => config::run(action),
        Command::Check => check::run().await,
    }
}

/// Everything a sync needs, wired from configuration.
pub struct SyncContext {
    pub config: GistSyncConfig,
    pub source: Arc<dyn SnippetSource>,
    pub mirror: Arc<Mirror>,
    pub ledger: Arc<dyn SyncLedger>,
}

impl SyncContext {
    pub fn from_config(config: GistSyncConfig, persist: bool) -> anyhow::Result<Self> {
        let source = GitHubGists::new(
            config.github_api_url.clone(),
            config.github_token.expose(),
            config.github_username.clone(),
        )?;

        let mut options = MirrorOptions::new(config.work_dir.clone());
        options.depth = config.clone_depth;
        let mirror = Mirror::new(
            Arc::new(GitCli),
            OpengistTarget::from_config(&config),
            options,
        );

        let ledger = open_ledger(&config, persist)?;

        Ok(Self {
            config,
            source: Arc::new(source),
            mirror: Arc::new(mirror),
            ledger,
        })
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.source.clone(), self.mirror.clone(), self.ledger.clone())
            .with_concurrency(self.config.sync_concurrency)
    }
}

fn open_ledger(config: &GistSyncConfig, persist: bool) -> anyhow::Result<Arc<dyn SyncLedger>> {
    let path = match (&config.db_path, persist) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(GistSyncConfig::default_db_path()?),
        (None, false) => None,
    };
    let ledger: Arc<dyn SyncLedger> = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "recording sync state in sqlite");
            Arc::new(SqliteLedger::open(&path)?)
        }
        None => Arc::new(MemoryLedger::new()),
    };
    Ok(ledger)
}

/// Database used by the read-only commands: `SYNC_DB_PATH`, else the default location.
pub fn state_db_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    match std::env::var("SYNC_DB_PATH") {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(GistSyncConfig::default_db_path()?),
    }
}
