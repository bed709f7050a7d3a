//! Core types for Convoy

use serde::{Deserialize, Serialize};

/// Version bump level, ordered so that `max` picks the strongest bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// No qualifying changes
    None,
    /// Patch version bump (bug fixes)
    Patch,
    /// Minor version bump (new features)
    Minor,
    /// Major version bump (breaking changes)
    Major,
    /// Pre-release increment
    Prerelease,
}

impl BumpLevel {
    /// Returns the string representation of the bump level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Prerelease => "prerelease",
        }
    }
}

impl std::fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BumpLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            "prerelease" | "pre" => Ok(Self::Prerelease),
            _ => Err(format!("Unknown bump keyword: {}", s)),
        }
    }
}

/// Versioning mode for the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseMode {
    /// Each package bumps separately
    #[default]
    Independent,
    /// All released packages share one version number
    Fixed,
}

impl std::fmt::Display for ReleaseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Independent => write!(f, "independent"),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

/// Kind of a declared dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Runtime dependency
    Runtime,
    /// Development dependency
    Dev,
    /// Peer dependency
    Peer,
}

impl DependencyKind {
    /// Manifest field name for this kind
    pub fn manifest_key(&self) -> &'static str {
        match self {
            Self::Runtime => "dependencies",
            Self::Dev => "devDependencies",
            Self::Peer => "peerDependencies",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_bump_level_from_str() {
        assert_eq!(BumpLevel::from_str("major").unwrap(), BumpLevel::Major);
        assert_eq!(BumpLevel::from_str("MINOR").unwrap(), BumpLevel::Minor);
        assert_eq!(BumpLevel::from_str("pre").unwrap(), BumpLevel::Prerelease);
        assert!(BumpLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_bump_level_ordering() {
        assert!(BumpLevel::Major > BumpLevel::Minor);
        assert!(BumpLevel::Minor > BumpLevel::Patch);
        assert!(BumpLevel::Patch > BumpLevel::None);
        assert_eq!(
            BumpLevel::Minor.max(BumpLevel::Major),
            BumpLevel::Major
        );
    }
}
