//! Publish command

use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use convoy_core::error::{ConvoyError, WorkflowError};
use convoy_core::hooks::HookRunner;
use convoy_core::prompt::{NonInteractive, Prompter};
use convoy_core::registry::NpmClient;
use convoy_core::release::{
    ChangelogWriter, NoChangelog, Orchestrator, ReleaseContext, ReleaseReport,
};
use convoy_changelog::{ConventionalBumpDetector, FileChangelogWriter};

use crate::cli::prompt::TerminalPrompter;
use crate::cli::Cli;

use super::{ReleaseArgs, Workspace};

/// Run the full release: version, build, and publish to the registry
#[derive(Debug, Args)]
pub struct PublishCommand {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Canary release: ephemeral versions, no commit, always rolled back
    #[arg(long)]
    pub canary: bool,

    /// Distribution tag attached to every upload
    #[arg(long)]
    pub dist_tag: Option<String>,

    /// One-time password for registries that require one
    #[arg(long)]
    pub otp: Option<String>,

    /// Leave the release commit and tags in place even if publishing fails
    #[arg(long)]
    pub no_rollback: bool,

    /// Skip registry reachability and permission checks
    #[arg(long)]
    pub no_verify_access: bool,

    /// Maximum concurrent uploads
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Registry to publish to (overrides the configured one)
    #[arg(long)]
    pub registry: Option<String>,
}

impl PublishCommand {
    /// Execute the publish command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut workspace = Workspace::load()?;
        if let Some(mode) = self.release.mode {
            workspace.config.mode = mode.into();
        }
        if let Some(registry) = &self.registry {
            workspace.config.registry = registry.clone();
        }

        let mut options = self.release.to_options()?;
        options.canary = self.canary;
        options.dist_tag = self.dist_tag.clone();
        options.otp = self.otp.clone();
        options.no_rollback = self.no_rollback;
        options.skip_verify = self.no_verify_access;
        options.concurrency = self.concurrency;

        let detector = ConventionalBumpDetector::new(&workspace.repo);
        let file_changelog;
        let changelog: &dyn ChangelogWriter = if self.release.no_changelog || self.canary {
            &NoChangelog
        } else {
            file_changelog =
                FileChangelogWriter::new(&workspace.repo, workspace.root.clone(), true);
            &file_changelog
        };

        let prompter: Arc<dyn Prompter> = if options.ci {
            Arc::new(NonInteractive)
        } else {
            Arc::new(TerminalPrompter)
        };

        let ctx = ReleaseContext {
            root: workspace.root.clone(),
            config: &workspace.config,
            packages: workspace.packages.clone(),
            vcs: &workspace.repo,
            registry: Arc::new(NpmClient::new(workspace.config.registry.clone())?),
            prompter,
            detector: &detector,
            changelog,
            hooks: HookRunner::from_root(workspace.root.clone()),
        };

        let report = Orchestrator::new(ctx, options).run()?;
        self.print_report(cli, &report);

        if !report.success() {
            return Err(ConvoyError::Workflow(WorkflowError::PartialPublish {
                failed: report.failed.len(),
                total: report.failed.len() + report.published.len(),
            })
            .into());
        }

        Ok(())
    }

    /// Report successes first, then failures, the way operators scan it.
    fn print_report(&self, cli: &Cli, report: &ReleaseReport) {
        info!(
            published = report.published.len(),
            failed = report.failed.len(),
            rolled_back = report.rolled_back,
            "publish run finished"
        );

        if cli.quiet {
            return;
        }

        if report.plan.is_empty() {
            println!("{}", style("No changed packages to publish.").yellow());
            return;
        }

        if !report.published.is_empty() {
            println!("{}", style("Successfully published:").green().bold());
            for name in &report.published {
                let version = report
                    .plan
                    .get(name)
                    .map(|p| p.next_version.to_string())
                    .unwrap_or_default();
                println!(" - {}@{}", name, version);
            }
        }

        if !report.failed.is_empty() {
            println!("{}", style("Failed to publish:").red().bold());
            for (name, reason) in &report.failed {
                println!(" - {}: {}", style(name).cyan(), reason);
            }
        }

        if report.rolled_back {
            println!(
                "{}",
                style("Working tree and tags were rolled back to the pre-release state.").yellow()
            );
        }
    }
}
