use std::path::PathBuf;

/// Central error type for gist-sync.
#[derive(Debug, thiserror::Error)]
pub enum GistSyncError {
    #[error("config error: {message}")]
    Config { message: String },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("git error: {message}")]
    GitError { message: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("gist not found: {id}")]
    NotFound { id: String },

    #[error("gist id {id:?} is not usable as a directory name")]
    InvalidId { id: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used in log fields and exit handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Filesystem,
    Storage,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Filesystem => write!(f, "filesystem"),
            ErrorKind::Storage => write!(f, "storage"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

impl GistSyncError {
    pub fn config(message: impl Into<String>) -> Self {
        GistSyncError::Config {
            message: message.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GistSyncError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GistSyncError::Config { .. } => ErrorKind::Configuration,
            GistSyncError::ApiError { .. }
            | GistSyncError::RateLimited { .. }
            | GistSyncError::GitError { .. }
            | GistSyncError::NotFound { .. } => ErrorKind::Transport,
            GistSyncError::Filesystem { .. } | GistSyncError::Io(_) => ErrorKind::Filesystem,
            GistSyncError::Database(_) => ErrorKind::Storage,
            GistSyncError::InvalidId { .. } | GistSyncError::Serialization(_) => ErrorKind::Other,
        }
    }
}
