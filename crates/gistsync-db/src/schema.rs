//! SQL statements for the sync-state database.

pub const CREATE_SCHEMA_VERSION: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
)";

pub const CREATE_SYNC_STATE: &str = "
CREATE TABLE IF NOT EXISTS sync_state (
    gist_id         TEXT PRIMARY KEY,
    last_synced_at  TEXT NOT NULL
)";

pub const CREATE_SYNC_HISTORY: &str = "
CREATE TABLE IF NOT EXISTS sync_history (
    id          TEXT PRIMARY KEY,
    gist_id     TEXT NOT NULL,
    status      TEXT NOT NULL,
    error       TEXT,
    started_at  TEXT NOT NULL,
    finished_at TEXT NOT NULL
)";

pub const CREATE_SYNC_HISTORY_GIST_INDEX: &str = "
CREATE INDEX IF NOT EXISTS idx_sync_history_gist
    ON sync_history (gist_id, finished_at)";
