//! Lifecycle script execution
//!
//! Packages declare named lifecycle commands in their manifest scripts map.
//! During the build stage the root-level script of the same name runs first,
//! then the package-level one, in strict sequence, so a dependency's hooks
//! finish before a dependent's begin.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{Result, WorkflowError};
use crate::package::Package;

/// Captured output of one executed script
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// The script name that ran
    pub script: String,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Execution time in milliseconds
    pub duration_ms: u64,
}

/// Runs lifecycle scripts for packages
pub struct HookRunner {
    root: PathBuf,
    root_scripts: BTreeMap<String, String>,
}

impl HookRunner {
    /// Create a runner; `root_scripts` come from the workspace-root manifest
    /// when one exists.
    pub fn new(root: impl Into<PathBuf>, root_scripts: BTreeMap<String, String>) -> Self {
        Self {
            root: root.into(),
            root_scripts,
        }
    }

    /// Load root scripts from a `package.json` at the workspace root, if any.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root_scripts = Package::load(&root.join("package.json"))
            .map(|pkg| pkg.scripts)
            .unwrap_or_default();
        Self { root, root_scripts }
    }

    /// Run the named lifecycle for one package: root-level script first (in
    /// the workspace root), then the package-level script (in the package
    /// directory). Missing scripts are skipped silently.
    pub fn run_lifecycle(&self, pkg: &Package, script: &str) -> Result<Vec<HookOutput>> {
        let mut outputs = Vec::new();

        if let Some(command) = self.root_scripts.get(script) {
            debug!(package = %pkg.name, script, scope = "root", "running lifecycle script");
            outputs.push(self.run_script(&self.root, pkg, script, command)?);
        }

        if let Some(command) = pkg.script(script) {
            debug!(package = %pkg.name, script, scope = "package", "running lifecycle script");
            outputs.push(self.run_script(&pkg.location, pkg, script, command)?);
        }

        if !outputs.is_empty() {
            info!(package = %pkg.name, script, count = outputs.len(), "lifecycle complete");
        }
        Ok(outputs)
    }

    fn run_script(
        &self,
        cwd: &Path,
        pkg: &Package,
        script: &str,
        command: &str,
    ) -> Result<HookOutput> {
        let start = Instant::now();

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };

        let output = cmd
            .current_dir(cwd)
            .env("CONVOY_ROOT", &self.root)
            .env("CONVOY_PACKAGE_NAME", &pkg.name)
            .env("CONVOY_PACKAGE_VERSION", pkg.version.to_string())
            .output()
            .map_err(|e| WorkflowError::HookFailed {
                package: pkg.name.clone(),
                script: script.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(WorkflowError::HookFailed {
                package: pkg.name.clone(),
                script: script.to_string(),
                reason: if stderr.trim().is_empty() {
                    format!("exit code {:?}", output.status.code())
                } else {
                    stderr.trim().to_string()
                },
            }
            .into());
        }

        Ok(HookOutput {
            script: script.to_string(),
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
