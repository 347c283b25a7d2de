use std::path::Path;
use std::process::Command;

use gistsync_core::error::GistSyncError;

/// Result of a git command execution.
#[derive(Debug)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// What a pull did to the working clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Updated,
    UpToDate,
}

/// What a push did to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    UpToDate,
}

/// Every branch, force-updated on the remote.
pub const MIRROR_REFSPEC: &str = "+refs/heads/*:refs/heads/*";

fn command() -> Command {
    let mut cmd = Command::new("git");
    // Never block on an interactive credential prompt.
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

fn run(cmd: &mut Command, what: &str) -> Result<GitOutput, GistSyncError> {
    let output = cmd.output().map_err(|e| GistSyncError::GitError {
        message: format!("failed to run git {what}: {e}"),
    })?;

    Ok(GitOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
    })
}

/// Run a git command in the given directory.
fn git(dir: &Path, args: &[&str]) -> Result<GitOutput, GistSyncError> {
    run(command().args(args).current_dir(dir), &args.join(" "))
}

/// Run a git command in the given directory, returning an error if it fails.
fn git_ok(dir: &Path, args: &[&str]) -> Result<String, GistSyncError> {
    let out = git(dir, args)?;
    if !out.success {
        return Err(GistSyncError::GitError {
            message: format!("git {} failed: {}", args.join(" "), out.stderr.trim()),
        });
    }
    Ok(out.stdout)
}

fn depth_arg(depth: u32) -> Option<String> {
    (depth > 0).then(|| format!("--depth={depth}"))
}

/// Clone a repo to a local path. `depth` 0 clones full history.
pub fn clone(url: &str, dest: &Path, depth: u32) -> Result<(), GistSyncError> {
    let mut cmd = command();
    cmd.arg("clone");
    if let Some(d) = depth_arg(depth) {
        cmd.arg(d);
    }
    cmd.arg(url).arg(dest);

    let out = run(&mut cmd, "clone")?;
    if !out.success {
        return Err(GistSyncError::GitError {
            message: format!("git clone {url} failed: {}", out.stderr.trim()),
        });
    }
    Ok(())
}

/// Fast-forward the current branch from `remote`.
///
/// Depth is not re-applied: a fresh `--depth` on a shallow clone detaches
/// the new tip from local history and the fast-forward fails.
pub fn pull(dir: &Path, remote: &str) -> Result<PullOutcome, GistSyncError> {
    let stdout = git_ok(dir, &["pull", "--ff-only", remote])?;
    if is_already_up_to_date(&stdout) {
        Ok(PullOutcome::UpToDate)
    } else {
        Ok(PullOutcome::Updated)
    }
}

/// Force-push all local branches to `url`. `label` names the remote in
/// errors so that credentials inside `url` never end up in messages.
///
/// Receivers refuse pushes from a shallow clone by default; on that
/// rejection the missing history is fetched from `source_remote` and the
/// push is retried once.
pub fn push_force(
    dir: &Path,
    url: &str,
    label: &str,
    source_remote: &str,
) -> Result<PushOutcome, GistSyncError> {
    let out = push_once(dir, url)?;
    let out = if !out.success && is_shallow_rejection(&out) {
        tracing::info!(remote = label, "destination refused shallow push, fetching full history");
        unshallow(dir, source_remote)?;
        push_once(dir, url)?
    } else {
        out
    };

    if !out.success {
        return Err(GistSyncError::GitError {
            message: push_failure(label, &out),
        });
    }

    if is_push_up_to_date(&out.stdout, &out.stderr) {
        Ok(PushOutcome::UpToDate)
    } else {
        Ok(PushOutcome::Pushed)
    }
}

fn push_once(dir: &Path, url: &str) -> Result<GitOutput, GistSyncError> {
    run(
        command()
            .args(["push", "--force", "--porcelain", url, MIRROR_REFSPEC])
            .current_dir(dir),
        "push",
    )
}

/// Fetch the history a shallow clone left out.
pub fn unshallow(dir: &Path, remote: &str) -> Result<(), GistSyncError> {
    git_ok(dir, &["fetch", "--unshallow", remote])?;
    Ok(())
}

/// Porcelain lines of refs the remote refused (`!` flag).
fn rejected_refs(stdout: &str) -> Vec<&str> {
    stdout
        .lines()
        .filter(|l| l.starts_with('!'))
        .map(str::trim)
        .collect()
}

fn is_shallow_rejection(out: &GitOutput) -> bool {
    const REASON: &str = "shallow update not allowed";
    out.stderr.contains(REASON) || rejected_refs(&out.stdout).iter().any(|l| l.contains(REASON))
}

/// stderr plus the per-ref reasons that `--porcelain` prints on stdout.
fn push_failure(label: &str, out: &GitOutput) -> String {
    let mut message = format!("git push to {label} failed: {}", out.stderr.trim());
    let rejected = rejected_refs(&out.stdout);
    if !rejected.is_empty() {
        message.push_str(" (");
        message.push_str(&rejected.join("; "));
        message.push(')');
    }
    message
}

/// Add a remote.
pub fn remote_add(dir: &Path, name: &str, url: &str) -> Result<(), GistSyncError> {
    git_ok(dir, &["remote", "add", name, url])?;
    Ok(())
}

/// Point an existing remote at a new URL.
pub fn remote_set_url(dir: &Path, name: &str, url: &str) -> Result<(), GistSyncError> {
    git_ok(dir, &["remote", "set-url", name, url])?;
    Ok(())
}

/// URL of a remote, if configured.
pub fn remote_get_url(dir: &Path, name: &str) -> Result<Option<String>, GistSyncError> {
    let out = git(dir, &["remote", "get-url", name])?;
    if out.success {
        Ok(Some(out.stdout.trim().to_string()))
    } else {
        Ok(None)
    }
}

/// Get the SHA of a ref.
pub fn rev_parse(dir: &Path, refspec: &str) -> Result<Option<String>, GistSyncError> {
    let out = git(dir, &["rev-parse", refspec])?;
    if out.success {
        Ok(Some(out.stdout.trim().to_string()))
    } else {
        Ok(None)
    }
}

fn is_already_up_to_date(stdout: &str) -> bool {
    stdout.contains("Already up to date") || stdout.contains("Already up-to-date")
}

/// With `--porcelain`, every ref line starts with a flag character; `=`
/// marks a ref that did not change. Older gits only print
/// "Everything up-to-date" on stderr when nothing matched.
fn is_push_up_to_date(stdout: &str, stderr: &str) -> bool {
    if stderr.contains("Everything up-to-date") {
        return true;
    }
    let flags: Vec<char> = stdout
        .lines()
        .filter(|l| l.contains('\t'))
        .filter_map(|l| l.chars().next())
        .collect();
    !flags.is_empty() && flags.iter().all(|&f| f == '=')
}
