//! Commit and tag information types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Information about one commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit hash
    pub hash: String,
    /// Subject line
    pub message: String,
    /// Message body, when present
    pub body: Option<String>,
    /// Author name
    pub author: String,
    /// Author email
    pub email: String,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    /// Create commit info
    pub fn new(
        hash: impl Into<String>,
        message: impl Into<String>,
        author: impl Into<String>,
        email: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
            body: None,
            author: author.into(),
            email: email.into(),
            timestamp,
        }
    }

    /// Set the message body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    /// Abbreviated hash for display
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }
}

/// Information about one tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag name
    pub name: String,
    /// Commit the tag points at
    pub target: String,
    /// Version embedded in the name, when the name carries one
    pub version: Option<String>,
    /// Annotation message, for annotated tags
    pub message: Option<String>,
}

impl TagInfo {
    /// Create tag info; the version is extracted from the name when it
    /// follows `v1.2.3` or `name@1.2.3` conventions.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let version = extract_version(&name);
        Self {
            name,
            target: target.into(),
            version,
            message: None,
        }
    }

    /// Set the annotation message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Extract a semantic version from a tag name.
///
/// Supports the shared `v1.2.3` form and the per-package `name@1.2.3` form
/// (including scoped names like `@scope/pkg@1.2.3`).
pub fn extract_version(name: &str) -> Option<String> {
    let candidate = if let Some(at) = name.rfind('@') {
        if at == 0 {
            // A leading @ is a scope marker, not a separator
            name
        } else {
            &name[at + 1..]
        }
    } else {
        name.strip_prefix('v').unwrap_or(name)
    };

    semver::Version::parse(candidate)
        .ok()
        .map(|v| v.to_string())
}
