//! Changelog types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use convoy_core::types::BumpLevel;

/// A parsed commit from conventional commit format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCommit {
    /// Original commit hash
    pub hash: String,
    /// Commit type (feat, fix, etc.); empty for non-conventional commits
    pub commit_type: String,
    /// Scope (optional, in parentheses)
    pub scope: Option<String>,
    /// Whether this is a breaking change
    pub breaking: bool,
    /// Commit description
    pub description: String,
    /// Breaking-change notes from the footer
    pub notes: Vec<String>,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
}

impl ParsedCommit {
    /// Bump level this single commit implies: breaking notes force major,
    /// features force at least minor, anything else implies patch.
    pub fn bump_level(&self) -> BumpLevel {
        if self.breaking {
            BumpLevel::Major
        } else if self.commit_type == "feat" {
            BumpLevel::Minor
        } else {
            BumpLevel::Patch
        }
    }
}

/// Classify a package's commit set: the strongest level across its commits,
/// `None` when nothing qualifies.
pub fn classify_commits(commits: &[ParsedCommit]) -> BumpLevel {
    commits
        .iter()
        .map(ParsedCommit::bump_level)
        .max()
        .unwrap_or(BumpLevel::None)
}

/// A titled group of commits inside one changelog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Section title
    pub title: String,
    /// Commits in this section
    pub commits: Vec<ParsedCommit>,
}

impl Section {
    /// Create a new section
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            commits: Vec::new(),
        }
    }

    /// Check if section is empty
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// Section title for a commit type
pub fn section_title(commit_type: &str) -> &'static str {
    match commit_type {
        "feat" => "Features",
        "fix" => "Bug Fixes",
        "perf" => "Performance Improvements",
        "revert" => "Reverts",
        "docs" => "Documentation",
        _ => "Other Changes",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(commit_type: &str, breaking: bool) -> ParsedCommit {
        ParsedCommit {
            hash: "abc1234".to_string(),
            commit_type: commit_type.to_string(),
            scope: None,
            breaking,
            description: "something".to_string(),
            notes: vec![],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_single_commit_levels() {
        assert_eq!(commit("feat", false).bump_level(), BumpLevel::Minor);
        assert_eq!(commit("fix", false).bump_level(), BumpLevel::Patch);
        assert_eq!(commit("chore", false).bump_level(), BumpLevel::Patch);
        assert_eq!(commit("fix", true).bump_level(), BumpLevel::Major);
    }

    #[test]
    fn test_classify_takes_maximum() {
        // feat + breaking note → major
        let commits = vec![commit("feat", false), commit("chore", true)];
        assert_eq!(classify_commits(&commits), BumpLevel::Major);

        // feat only → minor
        assert_eq!(classify_commits(&[commit("feat", false)]), BumpLevel::Minor);

        // nothing → none
        assert_eq!(classify_commits(&[]), BumpLevel::None);
    }
}
