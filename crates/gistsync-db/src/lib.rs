pub mod ledger;
pub mod migration;
pub mod ops;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

pub use ledger::SqliteLedger;

/// Open (or create) the sync-state database at the given path and run migrations.
pub fn open_db(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    migration::run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database for testing.
pub fn open_memory_db() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    migration::run_migrations(&conn)?;
    Ok(conn)
}
