//! Changed command

use clap::Args;
use console::style;
use tracing::info;

use convoy_core::changes::{UpdateCollector, UpdateOptions};
use convoy_core::graph::PackageGraph;
use convoy_core::release::Vcs;

use crate::cli::Cli;

use super::Workspace;

/// List packages changed since the last release
#[derive(Debug, Args)]
pub struct ChangedCommand {
    /// Changed paths matching these globs never count
    #[arg(long, value_delimiter = ',')]
    pub ignore_changes: Vec<String>,

    /// Packages treated as changed regardless of the diff
    #[arg(long, value_delimiter = ',')]
    pub force_publish: Vec<String>,

    /// Print names only, one per line
    #[arg(long)]
    pub parseable: bool,
}

impl ChangedCommand {
    /// Execute the changed command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let workspace = Workspace::load()?;
        let graph = PackageGraph::build(&workspace.packages);

        let since = Vcs::latest_release_tag(&workspace.repo)?;
        let changed_files = match &since {
            Some(reference) => Vcs::changed_files_since(&workspace.repo, reference)?,
            None => Vec::new(),
        };

        let mut ignore_globs = workspace.config.ignore_changes.clone();
        ignore_globs.extend(self.ignore_changes.iter().cloned());

        let collector = UpdateCollector::new(
            workspace.root.clone(),
            UpdateOptions {
                since: since.clone(),
                forced: self.force_publish.iter().cloned().collect(),
                ignore_globs,
                ..Default::default()
            },
        )?;
        let updates = collector.collect(&graph, &changed_files);
        info!(since = ?since, updates = updates.len(), "changed packages collected");

        if updates.is_empty() {
            if !cli.quiet {
                println!("{}", style("No changed packages.").yellow());
            }
            return Ok(());
        }

        for update in &updates {
            if self.parseable {
                println!("{}", update.package.name);
            } else {
                println!(
                    "{} {} ({})",
                    style(&update.package.name).cyan(),
                    update.package.version,
                    style(&update.reason).dim()
                );
            }
        }

        Ok(())
    }
}
