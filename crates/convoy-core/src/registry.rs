//! Registry client
//!
//! The release pipeline talks to the package registry through the
//! [`RegistryClient`] trait; the production implementation shells out to the
//! npm CLI, which owns credential storage and the actual wire protocol.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument, warn};

use crate::error::PublishError;
use crate::package::Package;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, PublishError>;

/// Capability interface to the package registry
pub trait RegistryClient: Send + Sync {
    /// Check that the registry answers at all.
    fn ping(&self) -> Result<()>;

    /// Check publish permission for one package.
    fn check_access(&self, package: &Package) -> Result<()>;

    /// Pack a distributable artifact; returns the tarball path.
    fn pack(&self, package: &Package) -> Result<PathBuf>;

    /// Upload a packed artifact under the given distribution tag. An OTP
    /// challenge surfaces as [`PublishError::OtpRequired`].
    fn publish(
        &self,
        package: &Package,
        tarball: &Path,
        dist_tag: &str,
        otp: Option<&str>,
    ) -> Result<()>;
}

/// Registry client backed by the npm CLI
pub struct NpmClient {
    registry: String,
    binary: PathBuf,
}

impl NpmClient {
    /// Create a client for the given registry URL. Fails when no npm binary
    /// is on PATH.
    pub fn new(registry: impl Into<String>) -> Result<Self> {
        let binary =
            which::which("npm").map_err(|_| PublishError::ClientNotFound("npm".to_string()))?;
        Ok(Self {
            registry: registry.into(),
            binary,
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--registry").arg(&self.registry);
        cmd
    }

    fn run(&self, cmd: &mut Command, what: &str) -> Result<std::process::Output> {
        cmd.output().map_err(|e| PublishError::CommandFailed {
            command: what.to_string(),
            reason: e.to_string(),
        })
    }
}

impl RegistryClient for NpmClient {
    #[instrument(skip(self))]
    fn ping(&self) -> Result<()> {
        let output = self.run(self.command().arg("ping"), "npm ping")?;
        if !output.status.success() {
            return Err(PublishError::Unreachable(self.registry.clone()));
        }
        debug!(registry = %self.registry, "registry reachable");
        Ok(())
    }

    #[instrument(skip(self, package), fields(package = %package.name))]
    fn check_access(&self, package: &Package) -> Result<()> {
        let output = self.run(
            self.command()
                .args(["access", "get", "status"])
                .arg(&package.name),
            "npm access",
        )?;

        if output.status.success() {
            return Ok(());
        }

        // A package that has never been published reports 404; that is not a
        // permission problem.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("E404") || stderr.contains("404") {
            debug!(package = %package.name, "package not yet published; access check passes");
            return Ok(());
        }

        Err(PublishError::AccessDenied {
            package: package.name.clone(),
            registry: self.registry.clone(),
        })
    }

    #[instrument(skip(self, package), fields(package = %package.name))]
    fn pack(&self, package: &Package) -> Result<PathBuf> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("pack").current_dir(&package.location);
        let output = self.run(&mut cmd, "npm pack")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PublishError::CommandFailed {
                command: "npm pack".to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        // npm pack prints the tarball filename on its last stdout line
        let stdout = String::from_utf8_lossy(&output.stdout);
        let tarball = stdout
            .lines()
            .last()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| PublishError::CommandFailed {
                command: "npm pack".to_string(),
                reason: "no tarball name in output".to_string(),
            })?;

        Ok(package.location.join(tarball))
    }

    #[instrument(skip(self, package, tarball, otp), fields(package = %package.name, dist_tag))]
    fn publish(
        &self,
        package: &Package,
        tarball: &Path,
        dist_tag: &str,
        otp: Option<&str>,
    ) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("publish")
            .arg(tarball)
            .arg("--tag")
            .arg(dist_tag)
            .current_dir(&package.location);

        if package.name.starts_with('@') {
            cmd.args(["--access", "public"]);
        }
        if let Some(otp) = otp {
            cmd.args(["--otp", otp]);
        }

        let output = self.run(&mut cmd, "npm publish")?;

        if output.status.success() {
            info!(package = %package.name, dist_tag, "published");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(package = %package.name, stderr = %stderr.trim(), "publish failed");
        Err(classify_publish_failure(&package.name, &stderr))
    }
}

/// Map npm publish stderr to a typed failure; an OTP challenge is the one
/// failure the caller retries.
pub fn classify_publish_failure(package: &str, stderr: &str) -> PublishError {
    if stderr.contains("EOTP") || stderr.to_lowercase().contains("one-time pass") {
        return PublishError::OtpRequired(package.to_string());
    }
    PublishError::UploadFailed {
        package: package.to_string(),
        reason: stderr.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_otp_challenge() {
        let err = classify_publish_failure(
            "pkg",
            "npm ERR! code EOTP\nnpm ERR! This operation requires a one-time password",
        );
        assert!(err.is_otp_challenge());

        let err = classify_publish_failure("pkg", "please enter the one-time pass from your app");
        assert!(err.is_otp_challenge());
    }

    #[test]
    fn test_classify_permanent_failure() {
        let err = classify_publish_failure("pkg", "npm ERR! code E403\nnpm ERR! forbidden");
        assert!(!err.is_otp_challenge());
        match err {
            PublishError::UploadFailed { package, reason } => {
                assert_eq!(package, "pkg");
                assert!(reason.contains("E403"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
