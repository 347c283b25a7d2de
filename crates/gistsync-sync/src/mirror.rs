use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gistsync_core::error::GistSyncError;
use gistsync_core::models::snippet::{GistId, Snippet};
use gistsync_core::models::sync_state::{CloneState, SyncAttempt, SyncStatus};
use gistsync_host::OpengistTarget;

use crate::git_ops::{self, PullOutcome, PushOutcome};

/// Name of the secondary remote pointing at the destination.
pub const DESTINATION_REMOTE: &str = "destination";

/// Name of the remote created by `git clone`.
pub const SOURCE_REMOTE: &str = "origin";

/// Delay after a push that changed the destination, giving Opengist time to
/// index the new revision.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// The git operations a mirror needs.
pub trait Git: Send + Sync {
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<(), GistSyncError>;

    fn pull(&self, dir: &Path, remote: &str) -> Result<PullOutcome, GistSyncError>;

    /// Make `name` point at `url`, adding it if missing.
    fn ensure_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GistSyncError>;

    /// Force-push all branches to `push_url`, which may carry credentials.
    fn force_push(
        &self,
        dir: &Path,
        remote: &str,
        push_url: &str,
    ) -> Result<PushOutcome, GistSyncError>;
}

/// [`Git`] backed by the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl Git for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<(), GistSyncError> {
        git_ops::clone(url, dest, depth)
    }

    fn pull(&self, dir: &Path, remote: &str) -> Result<PullOutcome, GistSyncError> {
        git_ops::pull(dir, remote)
    }

    fn ensure_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GistSyncError> {
        match git_ops::remote_get_url(dir, name)? {
            Some(existing) if existing == url => Ok(()),
            Some(existing) => {
                tracing::debug!(remote = name, from = %existing, to = url, "repointing remote");
                git_ops::remote_set_url(dir, name, url)
            }
            None => {
                tracing::info!(remote = name, url, "adding remote");
                git_ops::remote_add(dir, name, url)
            }
        }
    }

    fn force_push(
        &self,
        dir: &Path,
        remote: &str,
        push_url: &str,
    ) -> Result<PushOutcome, GistSyncError> {
        git_ops::push_force(dir, push_url, remote, SOURCE_REMOTE)
    }
}

/// Tunables of a [`Mirror`].
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Root under which per-gist working clones are created.
    pub work_dir: PathBuf,
    /// Shallow clone depth; 0 clones full history.
    pub depth: u32,
    pub settle_delay: Duration,
}

impl MirrorOptions {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            depth: 1,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Result of mirroring a single gist.
#[derive(Debug)]
pub struct MirrorResult {
    pub attempt: SyncAttempt,
    /// Where the working clone ended up. Anything but `CleanedUp` means a
    /// directory was left behind.
    pub clone_state: CloneState,
    pub work_path: PathBuf,
}

impl MirrorResult {
    pub fn gist_id(&self) -> &GistId {
        &self.attempt.gist_id
    }

    pub fn is_success(&self) -> bool {
        self.attempt.status.is_success()
    }
}

/// Mirrors gists from their source pull URL onto an Opengist target.
pub struct Mirror {
    git: Arc<dyn Git>,
    target: OpengistTarget,
    options: MirrorOptions,
}

impl Mirror {
    pub fn new(git: Arc<dyn Git>, target: OpengistTarget, options: MirrorOptions) -> Self {
        Self {
            git,
            target,
            options,
        }
    }

    pub fn target(&self) -> &OpengistTarget {
        &self.target
    }

    /// Working clone path of a gist.
    pub fn work_path(&self, id: &GistId) -> Result<PathBuf, GistSyncError> {
        let raw = id.as_str();
        let unsafe_id = raw.is_empty()
            || raw == "."
            || raw == ".."
            || raw.contains(['/', '\\'])
            || raw.contains('\0');
        if unsafe_id {
            return Err(GistSyncError::InvalidId { id: raw.to_string() });
        }
        Ok(self.options.work_dir.join(raw))
    }

    pub fn mirror_snippet(&self, snippet: &Snippet) -> MirrorResult {
        self.mirror(&snippet.id, &snippet.pull_url, &snippet.description)
    }

    /// Clone or update the gist locally, force-push it to the destination and
    /// remove the working clone again, whatever the outcome.
    pub fn mirror(&self, id: &GistId, pull_url: &str, description: &str) -> MirrorResult {
        let span = tracing::info_span!("mirror", gist_id = %id);
        let _enter = span.enter();

        let mut attempt = SyncAttempt::new(id.clone());
        tracing::info!(description, "syncing gist");

        let mut state = CloneState::Absent;
        let work_path = match self.work_path(id) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "refusing to mirror gist");
                attempt.status = SyncStatus::Failed;
                attempt.error = Some(e.to_string());
                attempt.finished_at = Utc::now();
                return MirrorResult {
                    attempt,
                    clone_state: CloneState::CleanedUp,
                    work_path: self.options.work_dir.clone(),
                };
            }
        };

        let result = self.mirror_inner(&work_path, id, pull_url, &mut state);

        state = self.cleanup(&work_path, state);
        attempt.finished_at = Utc::now();

        match result {
            Ok(PushOutcome::Pushed) => {
                tracing::info!("successfully synced gist");
                attempt.status = SyncStatus::Success;
            }
            Ok(PushOutcome::UpToDate) => {
                tracing::info!("gist already up to date");
                attempt.status = SyncStatus::UpToDate;
            }
            Err(e) => {
                tracing::error!(error = %e, kind = %e.kind(), "failed to sync gist");
                attempt.status = SyncStatus::Failed;
                attempt.error = Some(e.to_string());
            }
        }

        MirrorResult {
            attempt,
            clone_state: state,
            work_path,
        }
    }

    fn mirror_inner(
        &self,
        work_path: &Path,
        id: &GistId,
        pull_url: &str,
        state: &mut CloneState,
    ) -> Result<PushOutcome, GistSyncError> {
        // 1. Working root
        std::fs::create_dir_all(&self.options.work_dir)
            .map_err(|e| GistSyncError::filesystem(&self.options.work_dir, e))?;

        // 2./3. Clone, or update a clone left behind by an earlier cycle
        if work_path.exists() {
            *state = CloneState::Cloned;
            tracing::info!(path = %work_path.display(), "pulling existing clone");
            match self.git.pull(work_path, SOURCE_REMOTE)? {
                PullOutcome::UpToDate => tracing::debug!("clone already up to date"),
                PullOutcome::Updated => tracing::debug!("clone updated"),
            }
        } else {
            tracing::info!(url = pull_url, "cloning gist");
            self.git
                .clone_repo(pull_url, work_path, self.options.depth)?;
            *state = CloneState::Cloned;
        }

        // 4. Destination remote
        let remote_url = self.target.remote_url(id);
        self.git
            .ensure_remote(work_path, DESTINATION_REMOTE, &remote_url)?;

        // 5. Forced push with destination credentials
        tracing::info!(url = %remote_url, "pushing to opengist");
        let push_url = self.target.authenticated_url(id)?;
        let outcome = self
            .git
            .force_push(work_path, DESTINATION_REMOTE, &push_url)
            .map_err(|e| match e {
                GistSyncError::GitError { message } => GistSyncError::GitError {
                    message: self.target.redact(&message),
                },
                other => other,
            })?;
        *state = CloneState::Pushed;

        // 6. Settle
        if outcome == PushOutcome::Pushed && !self.options.settle_delay.is_zero() {
            std::thread::sleep(self.options.settle_delay);
        }

        Ok(outcome)
    }

    /// Remove the working clone. Failure is a warning and leaves `state` as is.
    fn cleanup(&self, work_path: &Path, state: CloneState) -> CloneState {
        if !work_path.exists() {
            return CloneState::CleanedUp;
        }
        match std::fs::remove_dir_all(work_path) {
            Ok(()) => CloneState::CleanedUp,
            Err(e) => {
                tracing::warn!(path = %work_path.display(), error = %e, "failed to clean up working clone");
                state
            }
        }
    }
}
