use serde::{Deserialize, Serialize};

/// Identifier of a gist, unique per source account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GistId(pub String);

impl GistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GistId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for GistId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A gist as listed by the source host. Fetched fresh every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: GistId,
    pub description: String,
    pub public: bool,
    /// Read transport endpoint. Also the only URL used against the source.
    pub pull_url: String,
    /// Write transport endpoint on the source host; never used.
    pub push_url: String,
    pub html_url: String,
}

impl Snippet {
    pub fn new(id: impl Into<String>, pull_url: impl Into<String>) -> Self {
        Self {
            id: GistId::new(id),
            description: String::new(),
            public: true,
            pull_url: pull_url.into(),
            push_url: String::new(),
            html_url: String::new(),
        }
    }
}
