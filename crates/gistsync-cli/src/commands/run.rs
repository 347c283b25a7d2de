use clap::Args;
use gistsync_core::config::GistSyncConfig;
use gistsync_sync::{CycleReport, Scheduler};

use super::SyncContext;
use crate::signals;

#[derive(Args, Default)]
pub struct RunArgs {
    /// Persist sync state in the default database when SYNC_DB_PATH is unset
    #[arg(long)]
    pub persist: bool,
}

fn load(args: &RunArgs) -> anyhow::Result<SyncContext> {
    let config = GistSyncConfig::from_env()?;
    tracing::info!(
        github_user = %config.github_username,
        opengist = %config.opengist_url,
        interval_minutes = config.sync_interval_minutes,
        "configuration loaded"
    );
    SyncContext::from_config(config, args.persist)
}

pub async fn daemon(args: RunArgs) -> anyhow::Result<()> {
    let ctx = load(&args)?;
    let shutdown = signals::install();

    let scheduler = Scheduler::new(ctx.reconciler(), ctx.config.sync_interval());
    scheduler.run(shutdown).await;

    tracing::info!("waiting for running mirrors to finish");
    tokio::select! {
        _ = scheduler.reconciler().wait_idle() => {}
        sig = signals::shutdown_signal() => {
            tracing::warn!(signal = sig, "received second signal, exiting now");
            std::process::exit(130);
        }
    }
    Ok(())
}

pub async fn once(args: RunArgs) -> anyhow::Result<()> {
    let ctx = load(&args)?;
    let report = ctx.reconciler().run_once().await?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &CycleReport) {
    println!(
        "\nSync complete: {} listed | {} synced | {} failed",
        report.listed,
        report.succeeded(),
        report.failed()
    );

    for result in &report.results {
        if let Some(err) = &result.attempt.error {
            println!("  {}: {err}", result.gist_id());
        }
        if result.clone_state.left_behind() {
            println!(
                "  {}: working clone left at {}",
                result.gist_id(),
                result.work_path.display()
            );
        }
    }
}
