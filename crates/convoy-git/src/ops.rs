//! Mutating repository operations: staging, committing, resetting, pushing

use std::path::{Path, PathBuf};

use git2::ResetType;
use tracing::{info, instrument};

use crate::repository::{GitRepo, Result};
use convoy_core::error::GitError;

impl GitRepo {
    /// Stage the given paths and create one commit; returns the new SHA.
    #[instrument(skip(self, paths, body), fields(files = paths.len(), subject))]
    pub fn stage_and_commit(&self, paths: &[PathBuf], subject: &str, body: &str) -> Result<String> {
        let workdir = self
            .workdir()
            .ok_or_else(|| GitError::OpenFailed("bare repository".to_string()))?
            .to_path_buf();

        let mut index = self.repo.index()?;
        for path in paths {
            let relative = if path.is_absolute() {
                path.strip_prefix(&workdir).unwrap_or(path)
            } else {
                path.as_path()
            };
            index.add_path(relative)?;
        }
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = self.head_commit()?;
        let sig = self
            .repo
            .signature()
            .or_else(|_| git2::Signature::now("convoy", "convoy@localhost"))?;

        let message = if body.is_empty() {
            subject.to_string()
        } else {
            format!("{}\n\n{}", subject, body)
        };

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&parent])?;

        info!(sha = %oid, files = paths.len(), "created release commit");
        Ok(oid.to_string())
    }

    /// Hard-reset the working tree to a commit.
    #[instrument(skip(self), fields(sha))]
    pub fn reset_hard(&self, sha: &str) -> Result<()> {
        let object = self.repo.revparse_single(sha)?;
        self.repo.reset(&object, ResetType::Hard, None)?;
        info!(sha, "hard reset working tree");
        Ok(())
    }
}

/// Push via the git CLI, which owns credential handling.
#[instrument(fields(remote, branch, follow_tags))]
pub fn git_push(
    workdir: &Path,
    remote: &str,
    branch: &str,
    follow_tags: bool,
) -> Result<()> {
    let mut cmd = std::process::Command::new("git");
    cmd.current_dir(workdir).arg("push");
    if follow_tags {
        cmd.arg("--follow-tags");
    }
    cmd.arg(remote).arg(branch);

    let output = cmd
        .output()
        .map_err(|e| GitError::PushFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::PushFailed(stderr.trim().to_string()));
    }

    info!(remote, branch, follow_tags, "pushed");
    Ok(())
}
