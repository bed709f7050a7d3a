//! Changelog file writer for the release pipeline
//!
//! Implements the orchestrator's changelog capability: per-package
//! `CHANGELOG.md` entries regenerated from the commits since the package's
//! last release tag, plus an optional workspace-root summary entry.

use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use convoy_core::error::Result;
use convoy_core::package::Package;
use convoy_core::release::ChangelogWriter;
use convoy_core::versioning::{PlannedRelease, ReleasePlan};
use convoy_git::GitRepo;

use crate::conventional::ConventionalParser;
use crate::generator::{render_entry, update_changelog};

/// Writes changelog files from repository history
pub struct FileChangelogWriter<'a> {
    repo: &'a GitRepo,
    root: PathBuf,
    include_root: bool,
}

impl<'a> FileChangelogWriter<'a> {
    /// Create a writer; `include_root` also maintains a workspace-root
    /// changelog summarizing each release.
    pub fn new(repo: &'a GitRepo, root: impl Into<PathBuf>, include_root: bool) -> Self {
        Self {
            repo,
            root: root.into(),
            include_root,
        }
    }
}

impl ChangelogWriter for FileChangelogWriter<'_> {
    fn update_package(&self, package: &Package, planned: &PlannedRelease) -> Result<Vec<PathBuf>> {
        let since = match self.repo.find_latest_tag(Some(&package.name))? {
            Some(tag) => Some(tag.name),
            None => self.repo.find_latest_tag(None)?.map(|t| t.name),
        };

        let workdir = self.repo.workdir().unwrap_or_else(|| self.repo.path());
        let prefix = package
            .location
            .strip_prefix(workdir)
            .unwrap_or(&package.location);

        let commits = self.repo.commits_touching(since.as_deref(), prefix)?;
        let parsed = ConventionalParser::new().parse_all(&commits);

        let entry = render_entry(&planned.next_version.to_string(), Utc::now(), &parsed);
        let path = package.location.join("CHANGELOG.md");
        update_changelog(&path, &entry)?;

        info!(package = %package.name, path = %path.display(), "wrote package changelog");
        Ok(vec![path])
    }

    fn update_root(&self, plan: &ReleasePlan) -> Result<Vec<PathBuf>> {
        if !self.include_root || plan.is_empty() {
            return Ok(Vec::new());
        }

        let first = plan.iter().next().map(|p| p.next_version.to_string());
        let mut entry = format!(
            "## {} ({})\n\n",
            first.unwrap_or_default(),
            Utc::now().format("%Y-%m-%d")
        );
        for planned in plan.iter() {
            entry.push_str(&format!(
                "* {}: {} => {}\n",
                planned.name, planned.current_version, planned.next_version
            ));
        }

        let path = self.root.join("CHANGELOG.md");
        update_changelog(&path, &entry)?;
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, Signature};
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, root: &Path, path: &str, message: &str) {
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, message).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();

        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parents: Vec<git2::Commit<'_>> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
    }

    fn planned(name: &str) -> PlannedRelease {
        PlannedRelease {
            name: name.to_string(),
            current_version: semver::Version::new(1, 0, 0),
            next_version: semver::Version::new(1, 1, 0),
            level: convoy_core::types::BumpLevel::Minor,
            reason: "changed".to_string(),
        }
    }

    #[test]
    fn test_update_package_writes_entry_from_history() {
        let temp = TempDir::new().unwrap();
        let raw = Repository::init(temp.path()).unwrap();
        commit_file(&raw, temp.path(), "packages/core/index.js", "chore: seed");
        let repo = GitRepo::open(temp.path()).unwrap();
        repo.create_tag("core@1.0.0", "release").unwrap();
        commit_file(&raw, temp.path(), "packages/core/a.js", "feat: shiny");

        let pkg = Package {
            name: "core".to_string(),
            version: semver::Version::new(1, 0, 0),
            location: temp.path().join("packages/core"),
            manifest_path: temp.path().join("packages/core/package.json"),
            private: false,
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
            peer_dependencies: BTreeMap::new(),
            scripts: BTreeMap::new(),
        };

        let writer = FileChangelogWriter::new(&repo, temp.path(), false);
        let written = writer.update_package(&pkg, &planned("core")).unwrap();

        assert_eq!(written.len(), 1);
        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert!(content.contains("## 1.1.0"));
        assert!(content.contains("shiny"));
    }

    #[test]
    fn test_update_root_summarizes_plan() {
        let temp = TempDir::new().unwrap();
        let raw = Repository::init(temp.path()).unwrap();
        commit_file(&raw, temp.path(), "file.txt", "chore: seed");
        let repo = GitRepo::open(temp.path()).unwrap();

        let mut plan = ReleasePlan::default();
        plan.insert(planned("core"));
        plan.insert(planned("utils"));

        let writer = FileChangelogWriter::new(&repo, temp.path(), true);
        let written = writer.update_root(&plan).unwrap();
        assert_eq!(written.len(), 1);

        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert!(content.contains("core: 1.0.0 => 1.1.0"));
        assert!(content.contains("utils: 1.0.0 => 1.1.0"));
    }
}
