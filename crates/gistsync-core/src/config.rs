use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::GistSyncError;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_OPENGIST_URL: &str = "http://localhost:6157";
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_CLONE_DEPTH: u32 = 1;

/// A credential that never shows up in `Debug` output or rendered config.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// Runtime configuration, sourced from the environment.
#[derive(Debug, Clone, Serialize)]
pub struct GistSyncConfig {
    pub github_token: Secret,
    pub github_username: String,
    pub github_api_url: url::Url,

    /// Destination base URL without trailing slash.
    pub opengist_url: String,
    pub opengist_username: String,
    pub opengist_token: Secret,

    pub sync_interval_minutes: u64,
    pub work_dir: PathBuf,

    /// Number of gists mirrored at once. 1 keeps cycles strictly sequential.
    pub sync_concurrency: usize,

    /// Shallow depth for clone and pull; 0 fetches full history.
    pub clone_depth: u32,

    /// When set, sync state is persisted in SQLite at this path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl GistSyncConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, GistSyncError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GistSyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| GistSyncError::config(format!("{key} is required")))
        };

        let github_token = Secret::new(required("GITHUB_TOKEN")?);
        let github_username = required("GITHUB_USERNAME")?;

        let api_raw = get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());
        let github_api_url = url::Url::parse(&api_raw)
            .map_err(|e| GistSyncError::config(format!("GITHUB_API_URL is invalid: {e}")))?;

        let opengist_url = normalize_base_url(
            &get("OPENGIST_URL").unwrap_or_else(|| DEFAULT_OPENGIST_URL.to_string()),
        );
        if opengist_url.is_empty() {
            return Err(GistSyncError::config("OPENGIST_URL is required"));
        }
        url::Url::parse(&opengist_url)
            .map_err(|e| GistSyncError::config(format!("OPENGIST_URL is invalid: {e}")))?;

        let opengist_username = required("OPENGIST_USERNAME")?;
        let opengist_token = Secret::new(required("OPENGIST_TOKEN")?);

        let sync_interval_minutes =
            parse_positive(get("SYNC_INTERVAL_MINUTES"), "SYNC_INTERVAL_MINUTES")?
                .unwrap_or(DEFAULT_SYNC_INTERVAL_MINUTES);
        let sync_concurrency = parse_positive(get("SYNC_CONCURRENCY"), "SYNC_CONCURRENCY")?
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_CONCURRENCY);
        let clone_depth = match get("CLONE_DEPTH") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                GistSyncError::config(format!("CLONE_DEPTH must be a non-negative integer, got {raw:?}"))
            })?,
            None => DEFAULT_CLONE_DEPTH,
        };

        let work_dir = get("WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_work_dir);
        let db_path = get("SYNC_DB_PATH").map(PathBuf::from);

        Ok(Self {
            github_token,
            github_username,
            github_api_url,
            opengist_url,
            opengist_username,
            opengist_token,
            sync_interval_minutes,
            work_dir,
            sync_concurrency,
            clone_depth,
            db_path,
        })
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_minutes * 60)
    }

    /// Default working-clone root: `<tmp>/gist-sync`.
    pub fn default_work_dir() -> PathBuf {
        std::env::temp_dir().join("gist-sync")
    }

    /// Default location of the sync-state database.
    pub fn default_db_path() -> Result<PathBuf, GistSyncError> {
        let base = dirs::data_local_dir()
            .ok_or_else(|| GistSyncError::config("could not determine local data directory"))?;
        Ok(base.join("gist-sync").join("sync.db"))
    }

    /// Render as TOML with credentials redacted.
    pub fn to_toml(&self) -> Result<String, GistSyncError> {
        toml::to_string_pretty(self).map_err(|e| GistSyncError::Serialization(e.to_string()))
    }
}

/// Strip surrounding whitespace and every trailing slash.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_positive(raw: Option<String>, key: &str) -> Result<Option<u64>, GistSyncError> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(GistSyncError::config(format!(
                "{key} must be a positive integer, got {raw:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_env() -> HashMap<String, String> {
        env(&[
            ("GITHUB_TOKEN", "ghp_source"),
            ("GITHUB_USERNAME", "octocat"),
            ("OPENGIST_USERNAME", "mirror"),
            ("OPENGIST_TOKEN", "og_dest"),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<GistSyncConfig, GistSyncError> {
        GistSyncConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = load(&base_env()).unwrap();
        assert_eq!(cfg.opengist_url, "http://localhost:6157");
        assert_eq!(cfg.sync_interval_minutes, 30);
        assert_eq!(cfg.sync_interval(), Duration::from_secs(1800));
        assert_eq!(cfg.sync_concurrency, 1);
        assert_eq!(cfg.clone_depth, 1);
        assert_eq!(cfg.work_dir, GistSyncConfig::default_work_dir());
        assert_eq!(cfg.github_api_url.as_str(), "https://api.github.com/");
        assert!(cfg.db_path.is_none());
    }

    #[test]
    fn test_missing_required_values() {
        for key in [
            "GITHUB_TOKEN",
            "GITHUB_USERNAME",
            "OPENGIST_USERNAME",
            "OPENGIST_TOKEN",
        ] {
            let mut vars = base_env();
            vars.remove(key);
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains(key), "{err}");

            let mut vars = base_env();
            vars.insert(key.to_string(), "   ".to_string());
            assert!(load(&vars).is_err());
        }
    }

    #[test]
    fn test_trailing_slashes_stripped() {
        let mut vars = base_env();
        vars.insert("OPENGIST_URL".into(), "https://gist.example.com//".into());
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.opengist_url, "https://gist.example.com");
    }

    #[test]
    fn test_slash_only_url_rejected() {
        let mut vars = base_env();
        vars.insert("OPENGIST_URL".into(), "/".into());
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("OPENGIST_URL"));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let mut vars = base_env();
        vars.insert("SYNC_INTERVAL_MINUTES".into(), "soon".into());
        assert!(load(&vars).is_err());
        vars.insert("SYNC_INTERVAL_MINUTES".into(), "0".into());
        assert!(load(&vars).is_err());
        vars.insert("SYNC_INTERVAL_MINUTES".into(), "5".into());
        assert_eq!(load(&vars).unwrap().sync_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_env();
        vars.insert("WORK_DIR".into(), "/var/lib/gist-sync".into());
        vars.insert("SYNC_CONCURRENCY".into(), "4".into());
        vars.insert("CLONE_DEPTH".into(), "0".into());
        vars.insert("SYNC_DB_PATH".into(), "/var/lib/gist-sync/sync.db".into());
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("/var/lib/gist-sync"));
        assert_eq!(cfg.sync_concurrency, 4);
        assert_eq!(cfg.clone_depth, 0);
        assert_eq!(cfg.db_path, Some(PathBuf::from("/var/lib/gist-sync/sync.db")));
    }

    #[test]
    fn test_rendered_config_redacts_tokens() {
        let cfg = load(&base_env()).unwrap();
        let rendered = cfg.to_toml().unwrap();
        assert!(!rendered.contains("ghp_source"));
        assert!(!rendered.contains("og_dest"));
        assert!(rendered.contains("***"));
        assert!(!format!("{cfg:?}").contains("og_dest"));
    }
}
