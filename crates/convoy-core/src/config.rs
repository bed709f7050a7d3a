//! Workspace configuration
//!
//! Loaded from `convoy.json` at the workspace root. Every field has a
//! default so a missing file yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::types::ReleaseMode;

/// Name of the workspace configuration file
pub const CONFIG_FILE: &str = "convoy.json";

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Versioning mode
    pub mode: ReleaseMode,

    /// Glob patterns (relative to the root) locating package directories
    pub packages: Vec<String>,

    /// Commit message template; `%v` is replaced with the version list,
    /// `%s` with a short summary
    pub message: String,

    /// Tag format for fixed mode; `{version}` is substituted
    pub tag_format: String,

    /// Globs for changed paths that never mark a package as updated
    pub ignore_changes: Vec<String>,

    /// Registry URL packages are published to
    pub registry: String,

    /// Default distribution tag
    pub dist_tag: String,

    /// Maximum concurrent registry uploads
    pub concurrency: usize,

    /// Treat dependency cycles as a fatal validation error
    pub reject_cycles: bool,

    /// Push the release commit and tags after a successful publish
    pub push: bool,

    /// Git remote used for upstream checks and pushes
    pub remote: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ReleaseMode::Independent,
            packages: vec!["packages/*".to_string()],
            message: "chore(release): publish %v".to_string(),
            tag_format: "v{version}".to_string(),
            ignore_changes: Vec::new(),
            registry: "https://registry.npmjs.org".to_string(),
            dist_tag: "latest".to_string(),
            concurrency: 4,
            reject_cycles: false,
            push: true,
            remote: "origin".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration from `convoy.json` under `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Err(ConfigError::NotFound(path).into());
        }
        Self::load_file(&path)
    }

    /// Load the configuration from an explicit file path.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        debug!(path = %path.display(), mode = %config.mode, "loaded configuration");
        Ok(config)
    }

    /// Load the configuration, falling back to defaults when the file is
    /// absent. Returns the path when a file was actually read.
    pub fn load_or_default(root: &Path) -> (Self, Option<PathBuf>) {
        let path = root.join(CONFIG_FILE);
        match Self::load_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(_) => (Self::default(), None),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.packages.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "packages".to_string(),
                message: "at least one package pattern is required".to_string(),
            }
            .into());
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into());
        }
        if !self.tag_format.contains("{version}") {
            return Err(ConfigError::InvalidValue {
                field: "tagFormat".to_string(),
                message: "must contain a {version} placeholder".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Render the shared tag name for a fixed-mode release.
    pub fn fixed_tag(&self, version: &str) -> String {
        self.tag_format.replace("{version}", version)
    }

    /// Render the tag name for one package in independent mode.
    pub fn package_tag(&self, package: &str, version: &str) -> String {
        format!("{}@{}", package, version)
    }
}
