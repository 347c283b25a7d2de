use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use comfy_table::{Cell, Table};
use gistsync_core::ledger::SyncLedger;
use gistsync_db::SqliteLedger;

#[derive(Args)]
pub struct StatusArgs {
    /// Sync-state database (defaults to SYNC_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,
}

pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    let path = super::state_db_path(args.db)?;
    if !path.exists() {
        println!("No sync state at {}. Run with SYNC_DB_PATH or --persist.", path.display());
        return Ok(());
    }
    let ledger = SqliteLedger::open(&path)?;
    let entries = ledger.entries()?;

    if entries.is_empty() {
        println!("No gists synced yet.");
        return Ok(());
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_header(vec!["GIST", "LAST SYNC", "AGO"]);
    for entry in &entries {
        let ago = now - entry.last_synced_at;
        table.add_row(vec![
            Cell::new(&entry.gist_id),
            Cell::new(entry.last_synced_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format!("{}m", ago.num_minutes())),
        ]);
    }
    println!("{table}");
    println!("\n{} gists tracked", entries.len());

    Ok(())
}
