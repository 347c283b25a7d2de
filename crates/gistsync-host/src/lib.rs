pub mod github;
pub mod opengist;
pub mod pagination;

use async_trait::async_trait;
use gistsync_core::error::GistSyncError;
use gistsync_core::models::snippet::{GistId, Snippet};

pub use github::GitHubGists;
pub use opengist::OpengistTarget;

/// A hosting service that lists the gists owned by one account.
#[async_trait]
pub trait SnippetSource: Send + Sync {
    /// List every gist of the authenticated account, following pagination
    /// to the end. Any failed page fails the whole listing.
    async fn list_all(&self) -> Result<Vec<Snippet>, GistSyncError>;

    /// Fetch a single gist by id.
    async fn get(&self, id: &GistId) -> Result<Option<Snippet>, GistSyncError>;

    /// Check that the configured token is accepted.
    async fn validate_credentials(&self) -> Result<bool, GistSyncError>;
}
