//! Commit history operations

use std::path::Path;

use chrono::{TimeZone, Utc};
use git2::{DiffOptions, Oid, Sort};

use crate::repository::{GitRepo, Result};
use crate::types::CommitInfo;

impl GitRepo {
    /// Get commits since a reference (tag or commit), newest first.
    pub fn commits_since(&self, since: &str) -> Result<Vec<CommitInfo>> {
        let since_oid = self.repo.revparse_single(since)?.id();
        self.walk_commits(Some(since_oid), None)
    }

    /// Get all commits on the current branch, newest first.
    pub fn all_commits(&self) -> Result<Vec<CommitInfo>> {
        self.walk_commits(None, None)
    }

    /// Get commits that touch paths under the given prefix, optionally
    /// limited to those after `since`. This is how per-package history is
    /// classified: the prefix is the package directory.
    pub fn commits_touching(&self, since: Option<&str>, prefix: &Path) -> Result<Vec<CommitInfo>> {
        let since_oid = match since {
            Some(reference) => Some(self.repo.revparse_single(reference)?.id()),
            None => None,
        };
        self.walk_commits(since_oid, Some(prefix))
    }

    fn walk_commits(&self, since: Option<Oid>, prefix: Option<&Path>) -> Result<Vec<CommitInfo>> {
        let head = self.head_commit()?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head.id())?;
        if let Some(since) = since {
            revwalk.hide(since)?;
        }

        let mut commits = Vec::new();

        for oid in revwalk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;

            if let Some(prefix) = prefix {
                if !self.commit_touches(&commit, prefix)? {
                    continue;
                }
            }

            commits.push(commit_to_info(&commit));
        }

        Ok(commits)
    }

    /// Whether a commit changed anything under the prefix, relative to its
    /// first parent (or to an empty tree for the root commit).
    fn commit_touches(&self, commit: &git2::Commit<'_>, prefix: &Path) -> Result<bool> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };

        let mut opts = DiffOptions::new();
        opts.pathspec(prefix.to_string_lossy().as_ref());

        let diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        Ok(diff.deltas().next().is_some())
    }
}

/// Convert a git2 Commit to CommitInfo
fn commit_to_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let author = commit.author();

    let message = commit.summary().unwrap_or("(no message)").to_string();
    let body = commit.body().map(|b| b.to_string());

    let timestamp = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);

    CommitInfo::new(
        commit.id().to_string(),
        message,
        author.name().unwrap_or("Unknown"),
        author.email().unwrap_or("unknown@example.com"),
        timestamp,
    )
    .with_body(body.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testutil::{commit_files, repo_with_files};

    #[test]
    fn test_all_commits_newest_first() {
        let (temp, repo) = repo_with_files(&[("file.txt", "one")]);
        commit_files(&repo, temp.path(), "feat: second", &[("file.txt", "two")]);

        let commits = repo.all_commits().unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "feat: second");
        assert_eq!(commits[1].message, "Initial commit");
    }

    #[test]
    fn test_commits_since() {
        let (temp, repo) = repo_with_files(&[("file.txt", "one")]);
        let base = repo.head_sha().unwrap();
        commit_files(&repo, temp.path(), "fix: later", &[("file.txt", "two")]);

        let commits = repo.commits_since(&base).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "fix: later");
    }

    #[test]
    fn test_commits_touching_filters_by_path() {
        let (temp, repo) = repo_with_files(&[("packages/a/index.js", "a")]);
        commit_files(
            &repo,
            temp.path(),
            "feat(a): change a",
            &[("packages/a/lib.js", "lib")],
        );
        commit_files(
            &repo,
            temp.path(),
            "feat(b): change b",
            &[("packages/b/index.js", "b")],
        );

        let touching_a = repo
            .commits_touching(None, Path::new("packages/a"))
            .unwrap();
        let messages: Vec<_> = touching_a.iter().map(|c| c.message.as_str()).collect();
        assert!(messages.contains(&"feat(a): change a"));
        assert!(messages.contains(&"Initial commit"));
        assert!(!messages.contains(&"feat(b): change b"));
    }

    #[test]
    fn test_commits_touching_since() {
        let (temp, repo) = repo_with_files(&[("packages/a/index.js", "a")]);
        let base = repo.head_sha().unwrap();
        commit_files(
            &repo,
            temp.path(),
            "feat(b): only b",
            &[("packages/b/index.js", "b")],
        );

        let touching_a = repo
            .commits_touching(Some(&base), Path::new("packages/a"))
            .unwrap();
        assert!(touching_a.is_empty());
    }
}
