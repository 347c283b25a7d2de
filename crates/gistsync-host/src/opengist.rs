use gistsync_core::config::{normalize_base_url, GistSyncConfig, Secret};
use gistsync_core::error::GistSyncError;
use gistsync_core::models::snippet::GistId;

/// Push target on the Opengist instance for one account.
///
/// Remote URLs are plain string joins of `base/account/id`; nothing checks
/// that the repository exists on the destination beforehand.
#[derive(Debug, Clone)]
pub struct OpengistTarget {
    base_url: String,
    username: String,
    token: Secret,
}

impl OpengistTarget {
    pub fn new(base_url: &str, username: impl Into<String>, token: Secret) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            username: username.into(),
            token,
        }
    }

    pub fn from_config(config: &GistSyncConfig) -> Self {
        Self::new(
            &config.opengist_url,
            config.opengist_username.clone(),
            config.opengist_token.clone(),
        )
    }

    /// `{base}/{account}/{id}` without credentials.
    pub fn remote_url(&self, id: &GistId) -> String {
        format!("{}/{}/{}", self.base_url, self.username, id)
    }

    /// Remote URL carrying basic-auth credentials for http(s) destinations.
    /// Other schemes (file, ssh) are returned unchanged.
    pub fn authenticated_url(&self, id: &GistId) -> Result<String, GistSyncError> {
        let plain = self.remote_url(id);
        let mut url = url::Url::parse(&plain).map_err(|e| GistSyncError::GitError {
            message: format!("invalid destination URL {plain}: {e}"),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Ok(plain);
        }

        url.set_username(&self.username)
            .and_then(|_| url.set_password(Some(self.token.expose())))
            .map_err(|_| GistSyncError::GitError {
                message: format!("cannot attach credentials to {plain}"),
            })?;
        Ok(url.to_string())
    }

    /// Replace any occurrence of the destination token in `text`, raw or in
    /// the percent-encoded form it takes inside an authenticated URL.
    pub fn redact(&self, text: &str) -> String {
        let token = self.token.expose();
        if token.is_empty() {
            return text.to_string();
        }
        let mut out = text.replace(token, "***");
        if let Some(encoded) = encoded_password(token) {
            if encoded != token {
                out = out.replace(&encoded, "***");
            }
        }
        out
    }
}

/// `token` as `Url::set_password` writes it into the userinfo.
fn encoded_password(token: &str) -> Option<String> {
    let mut url = url::Url::parse("http://user@localhost").ok()?;
    url.set_password(Some(token)).ok()?;
    url.password().map(str::to_string)
}
