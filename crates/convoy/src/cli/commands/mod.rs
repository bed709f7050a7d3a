//! CLI commands

mod changed;
mod publish;
mod version;

pub use changed::ChangedCommand;
pub use publish::PublishCommand;
pub use version::VersionCommand;

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;
use semver::Version;

use convoy_core::config::Config;
use convoy_core::error::VersionError;
use convoy_core::package::{Package, PackageLoader};
use convoy_core::release::ReleaseOptions;
use convoy_core::types::{BumpLevel, ReleaseMode};
use convoy_git::GitRepo;

/// Loaded workspace shared by every command
pub(crate) struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    pub packages: Vec<Package>,
    pub repo: GitRepo,
}

impl Workspace {
    /// Discover the repository, load configuration and packages.
    pub fn load() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let repo = GitRepo::discover(&cwd).map_err(convoy_core::error::ConvoyError::Git)?;
        let root = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        let (config, _config_path) = Config::load_or_default(&root);
        let packages = PackageLoader::new(&root, &config.packages).load()?;

        Ok(Self {
            root,
            config,
            packages,
            repo,
        })
    }
}

/// Versioning mode override
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    /// Each package bumps separately
    Independent,
    /// All released packages share one version
    Fixed,
}

impl From<ModeArg> for ReleaseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Independent => ReleaseMode::Independent,
            ModeArg::Fixed => ReleaseMode::Fixed,
        }
    }
}

/// Flags shared by the version and publish commands
#[derive(Debug, Args)]
pub struct ReleaseArgs {
    /// Bump keyword (patch, minor, major, prerelease) or an explicit version
    #[arg(value_name = "BUMP")]
    pub bump: Option<String>,

    /// Derive bumps from conventional commit history
    #[arg(long)]
    pub conventional_commits: bool,

    /// Packages to release regardless of changes
    #[arg(long, value_delimiter = ',')]
    pub force_publish: Vec<String>,

    /// Override the configured versioning mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Restrict the release to these packages
    #[arg(long, value_delimiter = ',')]
    pub scope: Vec<String>,

    /// Exclude these packages from the release
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Changed paths matching these globs never trigger a release
    #[arg(long, value_delimiter = ',')]
    pub ignore_changes: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Non-interactive mode (defaults on when $CI is set)
    #[arg(long, env = "CI")]
    pub ci: bool,

    /// Skip commit and tag creation
    #[arg(long)]
    pub no_git: bool,

    /// Skip pushing after a successful run
    #[arg(long)]
    pub no_push: bool,

    /// Skip changelog generation
    #[arg(long)]
    pub no_changelog: bool,
}

impl ReleaseArgs {
    /// Parse the positional bump argument into a keyword or a pinned
    /// version.
    pub fn parse_bump(&self) -> anyhow::Result<(Option<BumpLevel>, Option<Version>)> {
        let Some(raw) = &self.bump else {
            return Ok((None, None));
        };

        if let Ok(level) = raw.parse::<BumpLevel>() {
            return Ok((Some(level), None));
        }
        if let Ok(version) = Version::parse(raw) {
            return Ok((None, Some(version)));
        }

        Err(convoy_core::error::ConvoyError::Version(VersionError::InvalidBumpKeyword(
            raw.clone(),
        ))
        .into())
    }

    /// Build the core release options these flags describe.
    pub fn to_options(&self) -> anyhow::Result<ReleaseOptions> {
        let (bump, explicit_version) = self.parse_bump()?;

        Ok(ReleaseOptions {
            bump,
            explicit_version,
            conventional: self.conventional_commits,
            forced: self.force_publish.iter().cloned().collect::<BTreeSet<_>>(),
            include: self.scope.clone(),
            exclude: self.exclude.clone(),
            ignore_changes: self.ignore_changes.clone(),
            yes: self.yes || self.ci,
            ci: self.ci,
            no_git: self.no_git,
            no_push: self.no_push,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bump_keyword_and_version() {
        let mut args = release_args();
        args.bump = Some("minor".to_string());
        let (level, version) = args.parse_bump().unwrap();
        assert_eq!(level, Some(BumpLevel::Minor));
        assert!(version.is_none());

        args.bump = Some("2.0.0-rc.1".to_string());
        let (level, version) = args.parse_bump().unwrap();
        assert!(level.is_none());
        assert_eq!(version.unwrap().to_string(), "2.0.0-rc.1");

        args.bump = Some("bogus".to_string());
        assert!(args.parse_bump().is_err());
    }

    #[test]
    fn test_ci_implies_yes() {
        let mut args = release_args();
        args.ci = true;
        let options = args.to_options().unwrap();
        assert!(options.yes);
        assert!(options.ci);
    }

    fn release_args() -> ReleaseArgs {
        ReleaseArgs {
            bump: None,
            conventional_commits: false,
            force_publish: vec![],
            mode: None,
            scope: vec![],
            exclude: vec![],
            ignore_changes: vec![],
            yes: false,
            ci: false,
            no_git: false,
            no_push: false,
            no_changelog: false,
        }
    }
}
