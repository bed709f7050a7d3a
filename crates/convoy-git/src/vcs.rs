//! [`Vcs`] capability implementation
//!
//! The orchestrator drives version control through the `convoy-core` trait;
//! this adapter maps it onto the repository wrapper.

use std::path::PathBuf;

use convoy_core::error::Result;
use convoy_core::release::{UpstreamStatus, Vcs};

use crate::ops::git_push;
use crate::repository::GitRepo;

impl Vcs for GitRepo {
    fn head_sha(&self) -> Result<String> {
        Ok(GitRepo::head_sha(self)?)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(GitRepo::current_branch(self)?)
    }

    fn upstream_status(&self, remote: &str, branch: &str) -> Result<UpstreamStatus> {
        Ok(GitRepo::upstream_status(self, remote, branch)?)
    }

    fn latest_release_tag(&self) -> Result<Option<String>> {
        Ok(self.find_latest_tag(None)?.map(|t| t.name))
    }

    fn changed_files_since(&self, reference: &str) -> Result<Vec<PathBuf>> {
        Ok(GitRepo::changed_files_since(self, reference)?)
    }

    fn stage_and_commit(&self, paths: &[PathBuf], subject: &str, body: &str) -> Result<String> {
        Ok(GitRepo::stage_and_commit(self, paths, subject, body)?)
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        GitRepo::create_tag(self, name, message)?;
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        Ok(GitRepo::delete_tag(self, name)?)
    }

    fn reset_hard(&self, sha: &str) -> Result<()> {
        Ok(GitRepo::reset_hard(self, sha)?)
    }

    fn push(&self, remote: &str, branch: &str, follow_tags: bool) -> Result<()> {
        let workdir = self.workdir().unwrap_or_else(|| self.path()).to_path_buf();
        Ok(git_push(&workdir, remote, branch, follow_tags)?)
    }
}
