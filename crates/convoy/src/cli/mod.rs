//! CLI definition and command handling

pub mod commands;
pub mod prompt;

use clap::{Parser, Subcommand};

use commands::{ChangedCommand, PublishCommand, VersionCommand};

/// Convoy - Monorepo release manager
#[derive(Debug, Parser)]
#[command(name = "convoy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List packages changed since the last release
    Changed(ChangedCommand),

    /// Bump versions, write changelogs, commit and tag (no publish)
    Version(VersionCommand),

    /// Run the full release: version, build, and publish to the registry
    Publish(PublishCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Changed(ref cmd) => cmd.execute(&self),
            Commands::Version(ref cmd) => cmd.execute(&self),
            Commands::Publish(ref cmd) => cmd.execute(&self),
        }
    }
}
