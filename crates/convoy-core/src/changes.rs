//! Update collection
//!
//! Determines which packages count as changed relative to a historical
//! reference point. The collector itself never expands to dependents; that
//! is a policy decision left to the caller, because different commands apply
//! different expansion rules.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, instrument};

use crate::error::{ConfigError, Result};
use crate::graph::PackageGraph;
use crate::package::Package;

/// Why a package is part of the update set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateReason {
    /// No historical reference point exists; everything releases
    FirstRelease,
    /// A non-ignored path under the package directory differs
    Changed(PathBuf),
    /// Explicitly forced into the set
    Forced,
}

impl std::fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstRelease => write!(f, "first release"),
            Self::Changed(path) => write!(f, "changed: {}", path.display()),
            Self::Forced => write!(f, "forced"),
        }
    }
}

/// A package paired with the reason it is considered changed
#[derive(Debug, Clone)]
pub struct Update {
    /// The changed package
    pub package: Package,
    /// Why it is in the set
    pub reason: UpdateReason,
}

/// Options controlling update collection
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Historical reference point (tag or commit); `None` means no release
    /// has happened yet
    pub since: Option<String>,
    /// Packages always included regardless of the diff result
    pub forced: BTreeSet<String>,
    /// Restrict collection to these names when non-empty
    pub include: Vec<String>,
    /// Names never collected (forced names still win)
    pub exclude: Vec<String>,
    /// Changed paths matching these globs never mark a package as updated
    pub ignore_globs: Vec<String>,
}

/// Collects the set of changed packages
pub struct UpdateCollector {
    root: PathBuf,
    options: UpdateOptions,
    ignore: GlobSet,
}

impl UpdateCollector {
    /// Create a collector rooted at the workspace directory.
    pub fn new(root: impl Into<PathBuf>, options: UpdateOptions) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &options.ignore_globs {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidValue {
                field: "ignoreChanges".to_string(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(|e| ConfigError::InvalidValue {
            field: "ignoreChanges".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            root: root.into(),
            options,
            ignore,
        })
    }

    /// Produce the update set, preserving the graph's package ordering.
    ///
    /// `changed_files` are the paths differing between the reference point
    /// and the current state, relative to the workspace root; they are
    /// ignored entirely when no reference point exists.
    #[instrument(skip_all, fields(changed_files = changed_files.len()))]
    pub fn collect(&self, graph: &PackageGraph, changed_files: &[PathBuf]) -> Vec<Update> {
        let mut updates = Vec::new();

        for node in graph.iter() {
            let pkg = &node.package;

            if self.options.forced.contains(&pkg.name) {
                updates.push(Update {
                    package: pkg.clone(),
                    reason: UpdateReason::Forced,
                });
                continue;
            }

            if !self.eligible(&pkg.name) {
                continue;
            }

            match &self.options.since {
                None => updates.push(Update {
                    package: pkg.clone(),
                    reason: UpdateReason::FirstRelease,
                }),
                Some(since) => {
                    if let Some(path) = self.first_relevant_change(pkg, changed_files) {
                        debug!(package = %pkg.name, since, path = %path.display(), "package changed");
                        updates.push(Update {
                            package: pkg.clone(),
                            reason: UpdateReason::Changed(path),
                        });
                    }
                }
            }
        }

        info!(updates = updates.len(), "collected changed packages");
        updates
    }

    fn eligible(&self, name: &str) -> bool {
        if self.options.exclude.iter().any(|e| e == name) {
            return false;
        }
        if !self.options.include.is_empty() {
            return self.options.include.iter().any(|i| i == name);
        }
        true
    }

    /// First changed path that falls under the package subtree and is not
    /// filtered out by the ignore globs.
    fn first_relevant_change(&self, pkg: &Package, changed_files: &[PathBuf]) -> Option<PathBuf> {
        let pkg_prefix = pkg
            .location
            .strip_prefix(&self.root)
            .unwrap_or(&pkg.location);

        changed_files
            .iter()
            .find(|file| {
                let relative = self.relative(file);
                relative.starts_with(pkg_prefix) && !self.ignore.is_match(relative)
            })
            .cloned()
    }

    fn relative<'a>(&self, file: &'a Path) -> &'a Path {
        if file.is_absolute() {
            file.strip_prefix(&self.root).unwrap_or(file)
        } else {
            file
        }
    }
}
