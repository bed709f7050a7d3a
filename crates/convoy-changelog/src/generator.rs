//! Markdown changelog rendering and file updates

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use convoy_core::error::ChangelogError;

use crate::types::{section_title, ParsedCommit, Section};

/// Result type for changelog operations
pub type Result<T> = std::result::Result<T, ChangelogError>;

const HEADER: &str = "# Changelog";

/// Render one changelog entry for a version from its classified commits.
pub fn render_entry(version: &str, date: DateTime<Utc>, commits: &[ParsedCommit]) -> String {
    let mut out = format!("## {} ({})\n", version, date.format("%Y-%m-%d"));

    let breaking: Vec<&ParsedCommit> = commits.iter().filter(|c| c.breaking).collect();
    if !breaking.is_empty() {
        out.push_str("\n### BREAKING CHANGES\n\n");
        for commit in &breaking {
            for note in &commit.notes {
                out.push_str(&format!("* {}\n", note));
            }
            if commit.notes.is_empty() {
                out.push_str(&format!("* {}\n", commit.description));
            }
        }
    }

    for section in group_sections(commits) {
        out.push_str(&format!("\n### {}\n\n", section.title));
        for commit in &section.commits {
            let scope = commit
                .scope
                .as_ref()
                .map(|s| format!("**{}:** ", s))
                .unwrap_or_default();
            out.push_str(&format!(
                "* {}{} ({})\n",
                scope,
                commit.description,
                &commit.hash[..commit.hash.len().min(7)]
            ));
        }
    }

    if breaking.is_empty() && commits.is_empty() {
        out.push_str("\nNo notable changes.\n");
    }

    out
}

/// Group commits into titled sections, features first.
fn group_sections(commits: &[ParsedCommit]) -> Vec<Section> {
    let order = ["feat", "fix", "perf", "revert"];
    let mut sections: Vec<Section> = order
        .iter()
        .map(|t| Section::new(section_title(t)))
        .collect();

    for commit in commits {
        if let Some(pos) = order.iter().position(|t| *t == commit.commit_type) {
            sections[pos].commits.push(commit.clone());
        }
    }

    sections.retain(|s| !s.is_empty());
    sections
}

/// Prepend an entry into a changelog file, creating it (with its header)
/// when missing. Newer entries sit directly under the header.
pub fn update_changelog(path: &Path, entry: &str) -> Result<()> {
    let updated = match std::fs::read_to_string(path) {
        Ok(existing) => match existing.find("## ") {
            Some(pos) => format!("{}{}\n{}", &existing[..pos], entry, &existing[pos..]),
            None => format!("{}\n\n{}", existing.trim_end(), entry),
        },
        Err(_) => format!("{}\n\n{}", HEADER, entry),
    };

    std::fs::write(path, updated)
        .map_err(|e| ChangelogError::WriteFailed(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "updated changelog");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn commit(commit_type: &str, description: &str, breaking: bool) -> ParsedCommit {
        ParsedCommit {
            hash: "abcdef1234567".to_string(),
            commit_type: commit_type.to_string(),
            scope: None,
            breaking,
            description: description.to_string(),
            notes: if breaking {
                vec!["stop using the old API".to_string()]
            } else {
                vec![]
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_render_entry_sections() {
        let commits = vec![
            commit("feat", "add widgets", false),
            commit("fix", "stop crashing", false),
            commit("chore", "tidy", false),
        ];
        let entry = render_entry("1.2.0", Utc::now(), &commits);

        assert!(entry.starts_with("## 1.2.0 ("));
        assert!(entry.contains("### Features\n\n* add widgets"));
        assert!(entry.contains("### Bug Fixes\n\n* stop crashing"));
        // chores are not listed
        assert!(!entry.contains("tidy"));
    }

    #[test]
    fn test_render_breaking_section_first() {
        let commits = vec![commit("feat", "new api", true)];
        let entry = render_entry("2.0.0", Utc::now(), &commits);

        let breaking_pos = entry.find("### BREAKING CHANGES").unwrap();
        let features_pos = entry.find("### Features").unwrap();
        assert!(breaking_pos < features_pos);
        assert!(entry.contains("stop using the old API"));
    }

    #[test]
    fn test_update_creates_file_with_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("CHANGELOG.md");

        update_changelog(&path, "## 1.0.0 (2026-01-01)\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Changelog\n\n## 1.0.0"));
    }

    #[test]
    fn test_update_prepends_newest_entry() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("CHANGELOG.md");

        update_changelog(&path, "## 1.0.0 (2026-01-01)\n").unwrap();
        update_changelog(&path, "## 1.1.0 (2026-02-01)\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let newer = content.find("## 1.1.0").unwrap();
        let older = content.find("## 1.0.0").unwrap();
        assert!(newer < older);
    }
}
