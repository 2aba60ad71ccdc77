// Provisioning a working copy of the remote.
//
// `trickle run` and `trickle preview` both need a local checkout of the
// remote's current tracked content: the detector diffs against it, and the
// daemon commits into it. The checkout lands in a fresh temp directory
// that outlives this process; the daemon removes it at finalization.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use trickle_common::git::{GitError, GitWorker};
use trickle_common::types::Author;

/// Working-copy provisioning failures that deserve distinct handling.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Wrong URL, missing repository, or missing push access. Fatal and
    /// never retried; an empty remote is recovered automatically instead.
    #[error(
        "cannot access remote {remote}: {detail}\n\
         Make sure the repository exists and you have push access.\n\
         Tip: embed a token in the URL: https://<TOKEN>@github.com/user/repo.git"
    )]
    Inaccessible { remote: String, detail: String },
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A provisioned working copy.
#[derive(Debug)]
pub struct Workspace {
    pub dir: PathBuf,
}

impl Workspace {
    /// Best-effort removal; failures are logged, not fatal.
    pub fn remove(self) {
        if let Err(error) = std::fs::remove_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), %error, "failed to remove working copy");
        }
    }
}

/// Clone the remote's current content into a fresh temp directory.
///
/// An empty remote (no commits yet) is not an error: the directory is
/// initialized as a new repository with the remote registered as `origin`.
pub fn provision(remote: &str, author: Option<&Author>) -> Result<Workspace, ProvisionError> {
    let dir = tempfile::Builder::new().prefix("trickle-").tempdir()?.keep();
    debug!(dir = %dir.display(), "provisioning working copy");

    let parent = dir.parent().unwrap_or(Path::new(".")).to_path_buf();
    match GitWorker::new(parent).clone_shallow(remote, &dir) {
        Ok(_) => {}
        Err(GitError::Command { stderr, .. }) if is_access_error(&stderr) => {
            return Err(ProvisionError::Inaccessible {
                remote: remote.to_string(),
                detail: stderr.trim().to_string(),
            });
        }
        Err(GitError::Command { stderr, .. }) if is_empty_remote(&stderr) => {
            debug!("remote has no history yet; initializing a fresh repository");
            let init = GitWorker::new(&dir);
            init.init()?;
            init.add_remote("origin", remote)?;
        }
        Err(other) => return Err(other.into()),
    }

    if let Some(author) = author {
        let worker = GitWorker::new(&dir);
        worker.set_config("user.name", &author.name)?;
        worker.set_config("user.email", &author.email)?;
    }

    Ok(Workspace { dir })
}

/// Copy changed files from the source tree into the working copy, creating
/// parent directories as needed. Reports every missing source path at once
/// rather than stopping at the first.
pub fn copy_files(workspace_dir: &Path, source_dir: &Path, files: &[String]) -> Result<()> {
    let mut missing = Vec::new();

    for rel in files {
        let src = source_dir.join(rel);
        let dest = workspace_dir.join(rel);

        if !src.is_file() {
            missing.push(rel.clone());
            continue;
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::copy(&src, &dest)
            .with_context(|| format!("failed to copy {} into the working copy", src.display()))?;
    }

    if !missing.is_empty() {
        bail!(
            "missing source files under {}:\n{}",
            source_dir.display(),
            missing.iter().map(|f| format!("  - {f}")).collect::<Vec<_>>().join("\n")
        );
    }

    Ok(())
}

fn is_access_error(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("authentication failed")
        || lower.contains("repository not found")
        || lower.contains("could not read username")
        || lower.contains("could not read password")
        || lower.contains("permission denied")
}

fn is_empty_remote(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("empty repository")
        || lower.contains("couldn't find remote ref")
        || lower.contains("did not match any file")
        || lower.contains("nothing to fetch")
}
