use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use gistsync_core::models::snippet::GistId;
use gistsync_core::models::sync_state::{SyncAttempt, SyncEntry, SyncStatus};

// ── Helpers ──

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Fixed-width so that TEXT ordering matches time ordering, and at full
/// precision so values read back equal what was written.
fn fmt_dt(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// ── Sync state ──

pub fn upsert_last_synced(
    conn: &Connection,
    gist_id: &GistId,
    at: &DateTime<Utc>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sync_state (gist_id, last_synced_at) VALUES (?1, ?2)
         ON CONFLICT(gist_id) DO UPDATE SET last_synced_at = excluded.last_synced_at",
        params![gist_id.as_str(), fmt_dt(at)],
    )?;
    Ok(())
}

pub fn get_last_synced(
    conn: &Connection,
    gist_id: &GistId,
) -> anyhow::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT last_synced_at FROM sync_state WHERE gist_id = ?1",
            params![gist_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.as_deref().map(parse_dt))
}

pub fn list_sync_state(conn: &Connection) -> anyhow::Result<Vec<SyncEntry>> {
    let mut stmt =
        conn.prepare("SELECT gist_id, last_synced_at FROM sync_state ORDER BY gist_id")?;
    let rows = stmt.query_map([], |row| {
        let gist_id: String = row.get(0)?;
        let at: String = row.get(1)?;
        Ok(SyncEntry {
            gist_id: GistId(gist_id),
            last_synced_at: parse_dt(&at),
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ── Sync history ──

pub fn insert_sync_attempt(conn: &Connection, attempt: &SyncAttempt) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sync_history (id, gist_id, status, error, started_at, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            attempt.id.to_string(),
            attempt.gist_id.as_str(),
            attempt.status.to_string(),
            attempt.error,
            fmt_dt(&attempt.started_at),
            fmt_dt(&attempt.finished_at),
        ],
    )?;
    Ok(())
}

pub fn list_sync_history(
    conn: &Connection,
    gist_id: Option<&GistId>,
    limit: usize,
) -> anyhow::Result<Vec<SyncAttempt>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let (sql, filter) = match gist_id {
        Some(id) => (
            "SELECT id, gist_id, status, error, started_at, finished_at
             FROM sync_history WHERE gist_id = ?1
             ORDER BY finished_at DESC, id DESC LIMIT ?2",
            Some(id.as_str().to_string()),
        ),
        None => (
            "SELECT id, gist_id, status, error, started_at, finished_at
             FROM sync_history WHERE ?1 IS NULL
             ORDER BY finished_at DESC, id DESC LIMIT ?2",
            None,
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![filter, limit], row_to_attempt)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

fn row_to_attempt(row: &rusqlite::Row) -> rusqlite::Result<SyncAttempt> {
    let id_str: String = row.get(0)?;
    let gist_id: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let error: Option<String> = row.get(3)?;
    let started_at: String = row.get(4)?;
    let finished_at: String = row.get(5)?;

    Ok(SyncAttempt {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        gist_id: GistId(gist_id),
        status: status_str.parse().unwrap_or(SyncStatus::Failed),
        error,
        started_at: parse_dt(&started_at),
        finished_at: parse_dt(&finished_at),
    })
}
