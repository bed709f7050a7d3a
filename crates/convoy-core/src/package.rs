//! Workspace package model and manifest access
//!
//! Packages are npm-style: a `package.json` manifest carrying name, version,
//! dependency maps, and lifecycle scripts. Manifest writes round-trip through
//! `serde_json::Value` so fields convoy does not model are preserved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigError, ConvoyError, Result};
use crate::types::DependencyKind;

/// Name of the lockfile-like sibling metadata file
pub const LOCKFILE: &str = "package-lock.json";

/// A workspace package
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name (unique within the workspace)
    pub name: String,
    /// Current version
    pub version: Version,
    /// Package directory
    pub location: PathBuf,
    /// Path to package.json
    pub manifest_path: PathBuf,
    /// Whether the package is private (never published)
    pub private: bool,
    /// Runtime dependencies, name → declared range
    pub dependencies: BTreeMap<String, String>,
    /// Development dependencies
    pub dev_dependencies: BTreeMap<String, String>,
    /// Peer dependencies
    pub peer_dependencies: BTreeMap<String, String>,
    /// Lifecycle scripts, name → shell command
    pub scripts: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawManifest {
    name: String,
    version: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(rename = "peerDependencies", default)]
    peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

impl Package {
    /// Load a package from its manifest file.
    pub fn load(manifest_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(manifest_path)?;
        let raw: RawManifest = serde_json::from_str(&content)?;

        let version = Version::parse(&raw.version).map_err(|e| {
            crate::error::VersionError::ParseFailed(raw.version.clone(), e.to_string())
        })?;

        let location = manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        Ok(Self {
            name: raw.name,
            version,
            location,
            manifest_path: manifest_path.to_path_buf(),
            private: raw.private,
            dependencies: raw.dependencies,
            dev_dependencies: raw.dev_dependencies,
            peer_dependencies: raw.peer_dependencies,
            scripts: raw.scripts,
        })
    }

    /// All declared dependency entries as `(kind, name, range)`.
    pub fn dependency_entries(&self) -> impl Iterator<Item = (DependencyKind, &str, &str)> {
        let runtime = self
            .dependencies
            .iter()
            .map(|(n, r)| (DependencyKind::Runtime, n.as_str(), r.as_str()));
        let dev = self
            .dev_dependencies
            .iter()
            .map(|(n, r)| (DependencyKind::Dev, n.as_str(), r.as_str()));
        let peer = self
            .peer_dependencies
            .iter()
            .map(|(n, r)| (DependencyKind::Peer, n.as_str(), r.as_str()));
        runtime.chain(dev).chain(peer)
    }

    /// Look up a lifecycle script by name.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    /// Write the resolved version and updated sibling ranges back into the
    /// manifest, preserving fields convoy does not model. Also updates the
    /// version field of a sibling lockfile when one exists.
    pub fn write_versions(
        &self,
        next_version: &Version,
        sibling_versions: &BTreeMap<String, Version>,
    ) -> Result<()> {
        let content = std::fs::read_to_string(&self.manifest_path)?;
        let mut manifest: serde_json::Value = serde_json::from_str(&content)?;

        manifest["version"] = serde_json::Value::String(next_version.to_string());

        for key in ["dependencies", "devDependencies", "peerDependencies"] {
            let Some(section) = manifest.get_mut(key).and_then(|v| v.as_object_mut()) else {
                continue;
            };
            for (dep_name, next) in sibling_versions {
                if let Some(range) = section.get(dep_name).and_then(|v| v.as_str()) {
                    if let Some(updated) = updated_range(range, next) {
                        section.insert(
                            dep_name.clone(),
                            serde_json::Value::String(updated),
                        );
                    }
                }
            }
        }

        write_json(&self.manifest_path, &manifest)?;
        debug!(package = %self.name, version = %next_version, "wrote manifest");

        let lockfile = self.location.join(LOCKFILE);
        if lockfile.exists() {
            let lock_content = std::fs::read_to_string(&lockfile)?;
            let mut lock: serde_json::Value = serde_json::from_str(&lock_content)?;
            lock["version"] = serde_json::Value::String(next_version.to_string());
            write_json(&lockfile, &lock)?;
            debug!(package = %self.name, "updated lockfile version");
        }

        Ok(())
    }
}

/// Compute the range string to write for a bumped sibling, keeping the
/// declared operator. Local-protocol ranges are left untouched.
pub fn updated_range(range: &str, next: &Version) -> Option<String> {
    if is_local_protocol(range) {
        return None;
    }
    let prefix = match range.chars().next() {
        Some('^') => "^",
        Some('~') => "~",
        _ => "",
    };
    Some(format!("{}{}", prefix, next))
}

/// True for ranges that always resolve to the local workspace copy.
pub fn is_local_protocol(range: &str) -> bool {
    range.starts_with("workspace:") || range.starts_with("file:") || range.starts_with("link:")
}

/// True when `version` satisfies the declared `range`, treating local
/// protocols as always satisfied and unparseable ranges as unsatisfied.
pub fn range_satisfied(range: &str, version: &Version) -> bool {
    if is_local_protocol(range) {
        return true;
    }
    match semver::VersionReq::parse(range) {
        Ok(req) => req.matches(version),
        Err(_) => false,
    }
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    std::fs::write(path, rendered)?;
    Ok(())
}

/// Glob-based package discovery
pub struct PackageLoader {
    root: PathBuf,
    patterns: Vec<String>,
}

impl PackageLoader {
    /// Create a loader for the given workspace root and glob patterns.
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Self {
        Self {
            root: root.into(),
            patterns: patterns.to_vec(),
        }
    }

    /// Discover all packages, sorted by name. Duplicate names are a
    /// validation error.
    pub fn load(&self) -> Result<Vec<Package>> {
        let mut packages: Vec<Package> = Vec::new();

        for pattern in &self.patterns {
            let full_pattern = self.root.join(pattern).to_string_lossy().to_string();
            let entries = glob::glob(&full_pattern).map_err(|e| ConfigError::InvalidValue {
                field: "packages".to_string(),
                message: e.to_string(),
            })?;

            for entry in entries {
                let path = entry.map_err(|e| ConfigError::InvalidValue {
                    field: "packages".to_string(),
                    message: e.to_string(),
                })?;

                let manifest_path = if path.is_dir() {
                    path.join("package.json")
                } else {
                    continue;
                };

                if manifest_path.exists() {
                    packages.push(Package::load(&manifest_path)?);
                }
            }
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name));

        for pair in packages.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(ConvoyError::Config(ConfigError::DuplicatePackage(
                    pair[0].name.clone(),
                )));
            }
        }

        info!(count = packages.len(), "discovered packages");
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_package(root: &Path, dir: &str, manifest: &str) {
        let pkg_dir = root.join(dir);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("package.json"), manifest).unwrap();
    }

    #[test]
    fn test_load_package() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "packages/core",
            r#"{
                "name": "@acme/core",
                "version": "1.2.3",
                "dependencies": {"lodash": "^4.0.0"},
                "scripts": {"prepublish": "make build"}
            }"#,
        );

        let pkg = Package::load(&temp.path().join("packages/core/package.json")).unwrap();
        assert_eq!(pkg.name, "@acme/core");
        assert_eq!(pkg.version, Version::new(1, 2, 3));
        assert!(!pkg.private);
        assert_eq!(pkg.script("prepublish"), Some("make build"));
        assert_eq!(pkg.dependencies.get("lodash").unwrap(), "^4.0.0");
    }

    #[test]
    fn test_loader_sorted_and_deduplicated() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "packages/zeta",
            r#"{"name": "zeta", "version": "1.0.0"}"#,
        );
        write_package(
            temp.path(),
            "packages/alpha",
            r#"{"name": "alpha", "version": "1.0.0"}"#,
        );

        let loader = PackageLoader::new(temp.path(), &["packages/*".to_string()]);
        let packages = loader.load().unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "alpha");
        assert_eq!(packages[1].name, "zeta");
    }

    #[test]
    fn test_loader_rejects_duplicate_names() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "packages/a",
            r#"{"name": "same", "version": "1.0.0"}"#,
        );
        write_package(
            temp.path(),
            "packages/b",
            r#"{"name": "same", "version": "2.0.0"}"#,
        );

        let loader = PackageLoader::new(temp.path(), &["packages/*".to_string()]);
        let result = loader.load();
        assert!(matches!(
            result,
            Err(ConvoyError::Config(ConfigError::DuplicatePackage(_)))
        ));
    }

    #[test]
    fn test_write_versions_preserves_unknown_fields() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "packages/app",
            r#"{
                "name": "app",
                "version": "1.0.0",
                "description": "kept as-is",
                "dependencies": {"lib": "^1.0.0", "lodash": "^4.0.0"}
            }"#,
        );

        let pkg = Package::load(&temp.path().join("packages/app/package.json")).unwrap();
        let mut siblings = BTreeMap::new();
        siblings.insert("lib".to_string(), Version::new(1, 1, 0));

        pkg.write_versions(&Version::new(1, 0, 1), &siblings).unwrap();

        let content =
            std::fs::read_to_string(temp.path().join("packages/app/package.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(value["version"], "1.0.1");
        assert_eq!(value["description"], "kept as-is");
        assert_eq!(value["dependencies"]["lib"], "^1.1.0");
        // Non-sibling ranges untouched
        assert_eq!(value["dependencies"]["lodash"], "^4.0.0");
    }

    #[test]
    fn test_write_versions_updates_lockfile() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "packages/app",
            r#"{"name": "app", "version": "1.0.0"}"#,
        );
        std::fs::write(
            temp.path().join("packages/app").join(LOCKFILE),
            r#"{"name": "app", "version": "1.0.0", "lockfileVersion": 3}"#,
        )
        .unwrap();

        let pkg = Package::load(&temp.path().join("packages/app/package.json")).unwrap();
        pkg.write_versions(&Version::new(2, 0, 0), &BTreeMap::new())
            .unwrap();

        let lock: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join("packages/app").join(LOCKFILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(lock["version"], "2.0.0");
        assert_eq!(lock["lockfileVersion"], 3);
    }

    #[test]
    fn test_updated_range_keeps_operator() {
        let next = Version::new(2, 0, 0);
        assert_eq!(updated_range("^1.0.0", &next).unwrap(), "^2.0.0");
        assert_eq!(updated_range("~1.0.0", &next).unwrap(), "~2.0.0");
        assert_eq!(updated_range("1.0.0", &next).unwrap(), "2.0.0");
        assert!(updated_range("workspace:*", &next).is_none());
    }

    #[test]
    fn test_range_satisfied() {
        let v = Version::new(1, 2, 3);
        assert!(range_satisfied("^1.0.0", &v));
        assert!(!range_satisfied("^2.0.0", &v));
        assert!(range_satisfied("workspace:*", &v));
        assert!(range_satisfied("file:../core", &v));
        assert!(!range_satisfied("not a range", &v));
    }
}
