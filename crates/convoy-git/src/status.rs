//! Branch and working-tree status

use tracing::debug;

use crate::repository::{GitRepo, Result};
use convoy_core::error::GitError;
use convoy_core::release::UpstreamStatus;

impl GitRepo {
    /// Check if the working directory is clean (no uncommitted changes)
    pub fn is_clean(&self) -> Result<bool> {
        let statuses = self.repo.statuses(None)?;

        for entry in statuses.iter() {
            let status = entry.status();
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
                || status.is_wt_new()
                || status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Get the current branch name; `None` on a detached HEAD
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Position of a local branch relative to its remote counterpart.
    pub fn upstream_status(&self, remote: &str, branch: &str) -> Result<UpstreamStatus> {
        let local = self
            .repo
            .find_branch(branch, git2::BranchType::Local)
            .map_err(|_| GitError::OpenFailed(format!("no local branch '{}'", branch)))?;
        let local_oid = local
            .get()
            .target()
            .ok_or(GitError::NoCommits)?;

        let upstream_ref = format!("refs/remotes/{}/{}", remote, branch);
        let upstream_oid = match self.repo.find_reference(&upstream_ref) {
            Ok(reference) => match reference.target() {
                Some(oid) => oid,
                None => return Ok(UpstreamStatus::NoUpstream),
            },
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Ok(UpstreamStatus::NoUpstream)
            }
            Err(e) => return Err(e.into()),
        };

        let (ahead, behind) = self.repo.graph_ahead_behind(local_oid, upstream_oid)?;
        debug!(branch, ahead, behind, "compared branch with upstream");

        if behind > 0 {
            Ok(UpstreamStatus::Behind(behind))
        } else {
            Ok(UpstreamStatus::Current)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testutil::repo_with_files;

    #[test]
    fn test_is_clean_and_dirty() {
        let (temp, repo) = repo_with_files(&[("file.txt", "content")]);
        assert!(repo.is_clean().unwrap());

        std::fs::write(temp.path().join("new_file.txt"), "new").unwrap();
        assert!(!repo.is_clean().unwrap());
    }

    #[test]
    fn test_current_branch() {
        let (_temp, repo) = repo_with_files(&[("file.txt", "content")]);
        assert!(repo.current_branch().unwrap().is_some());
    }

    #[test]
    fn test_upstream_status_without_remote() {
        let (_temp, repo) = repo_with_files(&[("file.txt", "content")]);
        let branch = repo.current_branch().unwrap().unwrap();
        let status = repo.upstream_status("origin", &branch).unwrap();
        assert_eq!(status, UpstreamStatus::NoUpstream);
    }
}
