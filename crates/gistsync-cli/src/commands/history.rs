use std::path::PathBuf;

use clap::Args;
use comfy_table::{Cell, Color, Table};
use gistsync_core::ledger::SyncLedger;
use gistsync_core::models::snippet::GistId;
use gistsync_core::models::sync_state::SyncStatus;
use gistsync_db::SqliteLedger;

#[derive(Args)]
pub struct HistoryArgs {
    /// Only show attempts for this gist
    #[arg(long)]
    gist: Option<String>,
    /// Number of records to show
    #[arg(long, default_value = "20")]
    limit: usize,
    /// Sync-state database (defaults to SYNC_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,
}

pub fn run(args: HistoryArgs) -> anyhow::Result<()> {
    let path = super::state_db_path(args.db)?;
    if !path.exists() {
        println!("No sync history at {}.", path.display());
        return Ok(());
    }
    let ledger = SqliteLedger::open(&path)?;

    let gist = args.gist.map(GistId::new);
    let attempts = ledger.history(gist.as_ref(), args.limit)?;

    if attempts.is_empty() {
        println!("No sync history found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["STARTED", "GIST", "STATUS", "DURATION", "ERROR"]);
    for attempt in &attempts {
        let status = match attempt.status {
            SyncStatus::Success => Cell::new(&attempt.status).fg(Color::Green),
            SyncStatus::UpToDate => Cell::new(&attempt.status),
            SyncStatus::Failed => Cell::new(&attempt.status).fg(Color::Red),
        };
        let millis = (attempt.finished_at - attempt.started_at).num_milliseconds();
        table.add_row(vec![
            Cell::new(attempt.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&attempt.gist_id),
            status,
            Cell::new(format!("{millis}ms")),
            Cell::new(attempt.error.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");

    Ok(())
}
