//! Version command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use convoy_core::error::PublishError;
use convoy_core::hooks::HookRunner;
use convoy_core::package::Package;
use convoy_core::prompt::NonInteractive;
use convoy_core::registry::RegistryClient;
use convoy_core::release::{
    ChangelogWriter, NoChangelog, Orchestrator, ReleaseContext,
};
use convoy_changelog::{ConventionalBumpDetector, FileChangelogWriter};

use crate::cli::prompt::TerminalPrompter;
use crate::cli::Cli;

use super::{ReleaseArgs, Workspace};

/// Registry stand-in for version-only runs: they never build or upload.
struct OfflineRegistry;

impl RegistryClient for OfflineRegistry {
    fn ping(&self) -> Result<(), PublishError> {
        Ok(())
    }

    fn check_access(&self, _package: &Package) -> Result<(), PublishError> {
        Ok(())
    }

    fn pack(&self, package: &Package) -> Result<PathBuf, PublishError> {
        Err(PublishError::CommandFailed {
            command: "pack".to_string(),
            reason: format!("version-only run tried to pack '{}'", package.name),
        })
    }

    fn publish(
        &self,
        package: &Package,
        _tarball: &Path,
        _dist_tag: &str,
        _otp: Option<&str>,
    ) -> Result<(), PublishError> {
        Err(PublishError::UploadFailed {
            package: package.name.clone(),
            reason: "version-only run tried to publish".to_string(),
        })
    }
}

/// Bump versions, write changelogs, commit and tag (no publish)
#[derive(Debug, Args)]
pub struct VersionCommand {
    #[command(flatten)]
    pub release: ReleaseArgs,
}

impl VersionCommand {
    /// Execute the version command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut workspace = Workspace::load()?;
        if let Some(mode) = self.release.mode {
            workspace.config.mode = mode.into();
        }

        let mut options = self.release.to_options()?;
        options.skip_publish = true;
        options.skip_verify = true;

        let detector = ConventionalBumpDetector::new(&workspace.repo);
        let file_changelog;
        let changelog: &dyn ChangelogWriter = if self.release.no_changelog {
            &NoChangelog
        } else {
            file_changelog =
                FileChangelogWriter::new(&workspace.repo, workspace.root.clone(), true);
            &file_changelog
        };

        let prompter: Arc<dyn convoy_core::prompt::Prompter> = if options.ci {
            Arc::new(NonInteractive)
        } else {
            Arc::new(TerminalPrompter)
        };

        let ctx = ReleaseContext {
            root: workspace.root.clone(),
            config: &workspace.config,
            packages: workspace.packages.clone(),
            vcs: &workspace.repo,
            registry: Arc::new(OfflineRegistry),
            prompter,
            detector: &detector,
            changelog,
            hooks: HookRunner::from_root(workspace.root.clone()),
        };

        let report = Orchestrator::new(ctx, options).run()?;

        if report.plan.is_empty() {
            if !cli.quiet {
                println!("{}", style("No packages to version.").yellow());
            }
            return Ok(());
        }

        info!(planned = report.plan.len(), tags = report.tags.len(), "version run complete");
        if !cli.quiet {
            for planned in report.plan.iter() {
                println!(
                    "{} {}: {} {} {}",
                    style("✓").green(),
                    style(&planned.name).cyan(),
                    planned.current_version,
                    style("=>").dim(),
                    style(&planned.next_version).green().bold()
                );
            }
            for tag in &report.tags {
                println!("{} Created tag {}", style("✓").green(), style(tag).yellow());
            }
        }

        Ok(())
    }
}
