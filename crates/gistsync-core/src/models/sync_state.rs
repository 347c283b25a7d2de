use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::snippet::GistId;

/// Lifecycle of the transient working clone for one gist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneState {
    Absent,
    Cloned,
    Pushed,
    CleanedUp,
}

impl CloneState {
    /// Whether the working directory is expected to still be on disk.
    pub fn left_behind(&self) -> bool {
        matches!(self, CloneState::Cloned | CloneState::Pushed)
    }
}

impl std::fmt::Display for CloneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloneState::Absent => write!(f, "absent"),
            CloneState::Cloned => write!(f, "cloned"),
            CloneState::Pushed => write!(f, "pushed"),
            CloneState::CleanedUp => write!(f, "cleaned_up"),
        }
    }
}

/// Outcome of one mirror attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// New commits reached the destination.
    Success,
    /// Destination already matched the source.
    UpToDate,
    Failed,
}

impl SyncStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, SyncStatus::Failed)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::UpToDate => write!(f, "up_to_date"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SyncStatus::Success),
            "up_to_date" => Ok(SyncStatus::UpToDate),
            "failed" => Ok(SyncStatus::Failed),
            _ => Err(format!("unknown sync status: {s}")),
        }
    }
}

/// Last successful mirror time of a gist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub gist_id: GistId,
    pub last_synced_at: DateTime<Utc>,
}

/// Record of a single mirror attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAttempt {
    pub id: Uuid,
    pub gist_id: GistId,
    pub status: SyncStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncAttempt {
    pub fn new(gist_id: GistId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            gist_id,
            status: SyncStatus::Success,
            error: None,
            started_at: now,
            finished_at: now,
        }
    }
}
