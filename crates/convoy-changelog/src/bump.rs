//! Conventional-commit bump detection
//!
//! Implements the orchestrator's commit-analysis seam: a package's bump
//! level is the strongest level across the commits touching its directory
//! since its last release tag.

use std::path::Path;

use tracing::debug;

use convoy_core::error::Result;
use convoy_core::package::Package;
use convoy_core::types::BumpLevel;
use convoy_core::versioning::BumpDetector;
use convoy_git::GitRepo;

use crate::conventional::ConventionalParser;
use crate::types::classify_commits;

/// Detector backed by repository history and conventional-commit parsing
pub struct ConventionalBumpDetector<'a> {
    repo: &'a GitRepo,
    parser: ConventionalParser,
}

impl<'a> ConventionalBumpDetector<'a> {
    /// Create a detector over the given repository.
    pub fn new(repo: &'a GitRepo) -> Self {
        Self {
            repo,
            parser: ConventionalParser::new(),
        }
    }

    fn package_prefix<'p>(&self, package: &'p Package) -> &'p Path {
        let workdir = self.repo.workdir().unwrap_or_else(|| self.repo.path());
        package
            .location
            .strip_prefix(workdir)
            .unwrap_or(&package.location)
    }
}

impl BumpDetector for ConventionalBumpDetector<'_> {
    fn detect(&self, package: &Package) -> Result<BumpLevel> {
        // The package's own tag is the reference; fall back to the newest
        // release tag of any kind before the first per-package release
        let since = match self.repo.find_latest_tag(Some(&package.name))? {
            Some(tag) => Some(tag.name),
            None => self.repo.find_latest_tag(None)?.map(|t| t.name),
        };

        let prefix = self.package_prefix(package);
        let commits = self
            .repo
            .commits_touching(since.as_deref(), prefix)?;
        let parsed = self.parser.parse_all(&commits);
        let level = classify_commits(&parsed);

        debug!(
            package = %package.name,
            since = ?since,
            commits = commits.len(),
            level = %level,
            "classified package history"
        );
        Ok(level)
    }
}
