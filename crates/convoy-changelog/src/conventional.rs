//! Conventional Commits parser
//!
//! Parses commits following the Conventional Commits specification:
//! https://www.conventionalcommits.org/

use regex::Regex;
use std::sync::LazyLock;

use crate::types::ParsedCommit;
use convoy_git::CommitInfo;

/// Regex for parsing conventional commit subjects
static CONVENTIONAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<type>[a-zA-Z]+)(?:\((?P<scope>[^)]+)\))?(?P<breaking>!)?: (?P<description>.+)$",
    )
    .expect("Invalid regex")
});

/// Regex for breaking-change footer lines
static BREAKING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^BREAKING[ -]CHANGE: (?P<note>.+)$").expect("Invalid regex")
});

/// Parser for Conventional Commits format
#[derive(Debug, Default)]
pub struct ConventionalParser {
    /// Include merge commits
    pub include_merges: bool,
}

impl ConventionalParser {
    /// Create a new parser with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one commit. Non-conventional subjects yield a commit with an
    /// empty type so every change still classifies (as a patch); merge
    /// commits are dropped unless configured otherwise.
    pub fn parse(&self, commit: &CommitInfo) -> Option<ParsedCommit> {
        if !self.include_merges && commit.message.starts_with("Merge ") {
            return None;
        }

        let notes = commit
            .body
            .as_deref()
            .map(|body| {
                body.lines()
                    .filter_map(|line| {
                        BREAKING_REGEX
                            .captures(line)
                            .map(|caps| caps["note"].to_string())
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        match CONVENTIONAL_REGEX.captures(&commit.message) {
            Some(caps) => Some(ParsedCommit {
                hash: commit.hash.clone(),
                commit_type: caps["type"].to_lowercase(),
                scope: caps.name("scope").map(|m| m.as_str().to_string()),
                breaking: caps.name("breaking").is_some() || !notes.is_empty(),
                description: caps["description"].to_string(),
                notes,
                timestamp: commit.timestamp,
            }),
            None => Some(ParsedCommit {
                hash: commit.hash.clone(),
                commit_type: String::new(),
                scope: None,
                breaking: !notes.is_empty(),
                description: commit.message.clone(),
                notes,
                timestamp: commit.timestamp,
            }),
        }
    }

    /// Parse a commit list, dropping anything the parser skips.
    pub fn parse_all(&self, commits: &[CommitInfo]) -> Vec<ParsedCommit> {
        commits.iter().filter_map(|c| self.parse(c)).collect()
    }
}
