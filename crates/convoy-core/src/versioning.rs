//! Version resolution
//!
//! Computes the next version for every package in the update set. The bump
//! level comes from, in priority order: an explicit keyword, an interactive
//! per-package choice (independent mode only), or commit-history analysis
//! supplied through the [`BumpDetector`] seam.

use std::collections::BTreeMap;

use semver::{Prerelease, Version};
use tracing::{debug, info, instrument};

use crate::changes::{Update, UpdateReason};
use crate::error::{Result, VersionError};
use crate::package::Package;
use crate::prompt::Prompter;
use crate::types::{BumpLevel, ReleaseMode};

/// Commit-analysis seam: classifies a package's history since its last
/// release tag into a bump level. A custom classification hook replaces the
/// default conventional-commit analysis by substituting this implementation.
pub trait BumpDetector {
    /// Strongest bump level across the package's qualifying commits;
    /// `BumpLevel::None` when nothing qualifies.
    fn detect(&self, package: &Package) -> Result<BumpLevel>;
}

/// Detector that reports a fixed level for every package. Useful as a
/// non-git fallback and in tests.
pub struct FixedDetector(pub BumpLevel);

impl BumpDetector for FixedDetector {
    fn detect(&self, _package: &Package) -> Result<BumpLevel> {
        Ok(self.0)
    }
}

/// One planned package release
#[derive(Debug, Clone)]
pub struct PlannedRelease {
    /// Package name
    pub name: String,
    /// Version currently in the manifest
    pub current_version: Version,
    /// Resolved next version
    pub next_version: Version,
    /// Bump level applied
    pub level: BumpLevel,
    /// Why the package is being released
    pub reason: String,
}

/// The full release plan, keyed by package name
#[derive(Debug, Clone, Default)]
pub struct ReleasePlan {
    releases: BTreeMap<String, PlannedRelease>,
}

impl ReleasePlan {
    /// Look up a planned release.
    pub fn get(&self, name: &str) -> Option<&PlannedRelease> {
        self.releases.get(name)
    }

    /// True when nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Number of planned releases.
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Planned releases in name order.
    pub fn iter(&self) -> impl Iterator<Item = &PlannedRelease> {
        self.releases.values()
    }

    /// Map of name → next version, for rewriting sibling ranges.
    pub fn next_versions(&self) -> BTreeMap<String, Version> {
        self.releases
            .iter()
            .map(|(name, planned)| (name.clone(), planned.next_version.clone()))
            .collect()
    }

    /// Add or replace a planned release.
    pub fn insert(&mut self, planned: PlannedRelease) {
        self.releases.insert(planned.name.clone(), planned);
    }
}

/// Resolves bump levels and next versions for the update set
pub struct VersionResolver<'a> {
    mode: ReleaseMode,
    explicit: Option<BumpLevel>,
    explicit_version: Option<Version>,
    interactive: bool,
    detector: &'a dyn BumpDetector,
    prompter: &'a dyn Prompter,
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver.
    pub fn new(
        mode: ReleaseMode,
        explicit: Option<BumpLevel>,
        interactive: bool,
        detector: &'a dyn BumpDetector,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            mode,
            explicit,
            explicit_version: None,
            interactive,
            detector,
            prompter,
        }
    }

    /// Pin every planned release to a custom version instead of deriving one.
    pub fn with_explicit_version(mut self, version: Version) -> Self {
        self.explicit_version = Some(version);
        self
    }

    /// Build the release plan for the collected updates.
    #[instrument(skip_all, fields(mode = %self.mode, updates = updates.len()))]
    pub fn resolve(&self, updates: &[Update]) -> Result<ReleasePlan> {
        let plan = match self.mode {
            ReleaseMode::Independent => self.resolve_independent(updates)?,
            ReleaseMode::Fixed => self.resolve_fixed(updates)?,
        };
        info!(planned = plan.len(), "release plan resolved");
        Ok(plan)
    }

    fn resolve_independent(&self, updates: &[Update]) -> Result<ReleasePlan> {
        let mut plan = ReleasePlan::default();

        for update in updates {
            let pkg = &update.package;
            let forced = update.reason == UpdateReason::Forced;

            if let Some(version) = &self.explicit_version {
                plan.insert(PlannedRelease {
                    name: pkg.name.clone(),
                    current_version: pkg.version.clone(),
                    next_version: version.clone(),
                    level: level_between(&pkg.version, version),
                    reason: update.reason.to_string(),
                });
                continue;
            }

            let (level, explicit) = self.level_for(pkg)?;
            let level = match level {
                // Forced packages with nothing qualifying still ship a patch
                BumpLevel::None if forced => BumpLevel::Patch,
                BumpLevel::None => {
                    debug!(package = %pkg.name, "no qualifying commits; dropped from plan");
                    continue;
                }
                level => level,
            };

            let next = next_version(&pkg.version, level, explicit)?;
            plan.insert(PlannedRelease {
                name: pkg.name.clone(),
                current_version: pkg.version.clone(),
                next_version: next,
                level,
                reason: update.reason.to_string(),
            });
        }

        Ok(plan)
    }

    fn resolve_fixed(&self, updates: &[Update]) -> Result<ReleasePlan> {
        let mut plan = ReleasePlan::default();
        if updates.is_empty() {
            return Ok(plan);
        }

        if let Some(version) = &self.explicit_version {
            for update in updates {
                plan.insert(PlannedRelease {
                    name: update.package.name.clone(),
                    current_version: update.package.version.clone(),
                    next_version: version.clone(),
                    level: level_between(&update.package.version, version),
                    reason: update.reason.to_string(),
                });
            }
            return Ok(plan);
        }

        // One level for the whole workspace: the explicit keyword, or the
        // strongest level any changed package detects.
        let (level, explicit) = match self.explicit {
            Some(level) => (level, true),
            None => {
                let mut strongest = BumpLevel::None;
                for update in updates {
                    strongest = strongest.max(self.detector.detect(&update.package)?);
                }
                if strongest == BumpLevel::None {
                    strongest = BumpLevel::Patch;
                }
                (strongest, false)
            }
        };

        // One shared next version, computed from the highest current version
        let highest = updates
            .iter()
            .map(|u| &u.package.version)
            .max()
            .cloned()
            .unwrap_or_else(|| Version::new(0, 0, 0));
        let next = next_version(&highest, level, explicit)?;

        for update in updates {
            plan.insert(PlannedRelease {
                name: update.package.name.clone(),
                current_version: update.package.version.clone(),
                next_version: next.clone(),
                level,
                reason: update.reason.to_string(),
            });
        }

        Ok(plan)
    }

    /// Bump level for one package plus whether it was chosen explicitly.
    fn level_for(&self, pkg: &Package) -> Result<(BumpLevel, bool)> {
        if let Some(level) = self.explicit {
            return Ok((level, true));
        }
        if self.interactive {
            let options = ["patch", "minor", "major", "prerelease"];
            let prompt = format!(
                "Select a version bump for {} (currently {})",
                pkg.name, pkg.version
            );
            let index = self.prompter.select_one(&prompt, &options)?;
            let level = options[index]
                .parse::<BumpLevel>()
                .map_err(VersionError::InvalidBumpKeyword)?;
            return Ok((level, true));
        }
        Ok((self.detector.detect(pkg)?, false))
    }
}

/// Level implied by moving from one version to another; used to record what
/// a custom version amounts to.
fn level_between(current: &Version, next: &Version) -> BumpLevel {
    if !next.pre.is_empty() {
        BumpLevel::Prerelease
    } else if next.major != current.major {
        BumpLevel::Major
    } else if next.minor != current.minor {
        BumpLevel::Minor
    } else {
        BumpLevel::Patch
    }
}

/// Apply a bump level to a version.
///
/// A current prerelease keeps incrementing the same prerelease identifier
/// unless the level was chosen explicitly.
pub fn next_version(current: &Version, level: BumpLevel, explicit: bool) -> Result<Version> {
    if !current.pre.is_empty() && !explicit {
        return continue_prerelease(current);
    }

    let mut v = current.clone();
    v.build = semver::BuildMetadata::EMPTY;

    match level {
        BumpLevel::Major => {
            v.major += 1;
            v.minor = 0;
            v.patch = 0;
            v.pre = Prerelease::EMPTY;
        }
        BumpLevel::Minor => {
            v.minor += 1;
            v.patch = 0;
            v.pre = Prerelease::EMPTY;
        }
        BumpLevel::Patch | BumpLevel::None => {
            v.patch += 1;
            v.pre = Prerelease::EMPTY;
        }
        BumpLevel::Prerelease => {
            if v.pre.is_empty() {
                v.patch += 1;
                v.pre = Prerelease::new("alpha.0")
                    .map_err(|e| VersionError::ParseFailed("alpha.0".into(), e.to_string()))?;
            } else {
                return continue_prerelease(current);
            }
        }
    }

    Ok(v)
}

/// Increment the trailing numeric component of a prerelease identifier,
/// keeping the identifier itself (`1.1.0-beta.2` → `1.1.0-beta.3`).
fn continue_prerelease(current: &Version) -> Result<Version> {
    let pre = current.pre.as_str();
    let next_pre = match pre.rsplit_once('.') {
        Some((prefix, num)) if num.chars().all(|c| c.is_ascii_digit()) => {
            let n: u64 = num
                .parse()
                .map_err(|_| VersionError::ParseFailed(pre.to_string(), "bad prerelease".into()))?;
            format!("{}.{}", prefix, n + 1)
        }
        _ => format!("{}.0", pre),
    };

    let mut v = current.clone();
    v.pre = Prerelease::new(&next_pre)
        .map_err(|e| VersionError::ParseFailed(next_pre.clone(), e.to_string()))?;
    Ok(v)
}
