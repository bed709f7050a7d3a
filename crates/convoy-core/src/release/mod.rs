//! Release orchestration
//!
//! The release is an explicit pipeline of stage handlers over a context
//! struct: `INIT → VERIFY → PLAN → CONFIRM → WRITE → COMMIT_TAG → BUILD →
//! PUBLISH → DONE`, with `FAILED` reachable from any stage. Each handler
//! returns the next stage or an error; there is no shared ambient state.

pub mod publish;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use semver::Version;
use tracing::{debug, info, instrument, warn};

use crate::changes::{UpdateCollector, UpdateOptions};
use crate::config::Config;
use crate::error::{GitError, Result, WorkflowError};
use crate::graph::batches::build_batches;
use crate::graph::PackageGraph;
use crate::hooks::HookRunner;
use crate::package::Package;
use crate::prompt::Prompter;
use crate::registry::RegistryClient;
use crate::types::{BumpLevel, ReleaseMode};
use crate::versioning::{BumpDetector, PlannedRelease, ReleasePlan, VersionResolver};

use publish::{publish_batches, PublishOutcome};

/// Position of the branch relative to its remote-tracking counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStatus {
    /// In sync or ahead only
    Current,
    /// Behind the remote by this many commits
    Behind(usize),
    /// No remote-tracking branch exists
    NoUpstream,
}

/// Version-control capability the orchestrator drives.
///
/// Only used from the orchestrating thread, so no `Send`/`Sync` bound; the
/// backing repository handle is not thread-safe.
pub trait Vcs {
    /// SHA of the current HEAD commit.
    fn head_sha(&self) -> Result<String>;

    /// Current branch name; `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<String>>;

    /// Branch position relative to its remote counterpart.
    fn upstream_status(&self, remote: &str, branch: &str) -> Result<UpstreamStatus>;

    /// Most recent release tag, if any.
    fn latest_release_tag(&self) -> Result<Option<String>>;

    /// Paths changed between the reference and the working tree.
    fn changed_files_since(&self, reference: &str) -> Result<Vec<PathBuf>>;

    /// Stage the given paths and create one commit; returns the new SHA.
    fn stage_and_commit(&self, paths: &[PathBuf], subject: &str, body: &str) -> Result<String>;

    /// Create an annotated tag at HEAD.
    fn create_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Remove a tag.
    fn delete_tag(&self, name: &str) -> Result<()>;

    /// Hard-reset the working tree to a commit.
    fn reset_hard(&self, sha: &str) -> Result<()>;

    /// Push the branch (and tags) to the remote.
    fn push(&self, remote: &str, branch: &str, follow_tags: bool) -> Result<()>;
}

/// Changelog-writing capability used during the write stage
pub trait ChangelogWriter {
    /// Regenerate the package's changelog entry for its planned release;
    /// returns the files written, for staging.
    fn update_package(&self, package: &Package, planned: &PlannedRelease) -> Result<Vec<PathBuf>>;

    /// Regenerate the workspace-root changelog; returns the files written.
    fn update_root(&self, plan: &ReleasePlan) -> Result<Vec<PathBuf>>;
}

/// Changelog writer that writes nothing (canary runs, `--no-changelog`).
pub struct NoChangelog;

impl ChangelogWriter for NoChangelog {
    fn update_package(&self, _package: &Package, _planned: &PlannedRelease) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn update_root(&self, _plan: &ReleasePlan) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

/// Options for one release run
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    /// Explicit bump keyword; overrides prompting and commit analysis
    pub bump: Option<BumpLevel>,
    /// Custom version pinning every planned release
    pub explicit_version: Option<Version>,
    /// Stop after the commit/tag stage (version-only runs)
    pub skip_publish: bool,
    /// Derive bumps from commit history instead of prompting
    pub conventional: bool,
    /// Packages released regardless of the diff result
    pub forced: BTreeSet<String>,
    /// Restrict to these package names when non-empty
    pub include: Vec<String>,
    /// Never release these packages
    pub exclude: Vec<String>,
    /// Extra ignore globs merged with the configured ones
    pub ignore_changes: Vec<String>,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Non-interactive environment: soften interactive-only checks
    pub ci: bool,
    /// Canary release: no commit/tag, always rolled back
    pub canary: bool,
    /// Explicit distribution tag
    pub dist_tag: Option<String>,
    /// One-time password supplied up front
    pub otp: Option<String>,
    /// Never roll back, even after publish failures
    pub no_rollback: bool,
    /// Skip registry verification
    pub skip_verify: bool,
    /// Skip commit and tag creation
    pub no_git: bool,
    /// Skip pushing after a successful publish
    pub no_push: bool,
    /// Override the configured upload concurrency
    pub concurrency: Option<usize>,
}

/// Stages of the release state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReleaseStage {
    Init,
    Verify,
    Plan,
    Confirm,
    Write,
    CommitTag,
    Build,
    Publish,
    Done,
    Failed,
}

/// Outcome of a release run
#[derive(Debug)]
pub struct ReleaseReport {
    /// The resolved plan (empty when nothing qualified)
    pub plan: ReleasePlan,
    /// Packages whose upload succeeded
    pub published: Vec<String>,
    /// Packages whose upload failed, with the failure text
    pub failed: Vec<(String, String)>,
    /// Tags created by this run (empty after rollback)
    pub tags: Vec<String>,
    /// Whether the working tree was rolled back
    pub rolled_back: bool,
}

impl ReleaseReport {
    /// True when every planned package published.
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Collaborators injected into the orchestrator
pub struct ReleaseContext<'a> {
    /// Workspace root
    pub root: PathBuf,
    /// Workspace configuration
    pub config: &'a Config,
    /// Full package list from the loader
    pub packages: Vec<Package>,
    /// Version control
    pub vcs: &'a dyn Vcs,
    /// Package registry (shared with upload tasks)
    pub registry: Arc<dyn RegistryClient>,
    /// Operator interaction (shared with the OTP prompt)
    pub prompter: Arc<dyn Prompter>,
    /// Commit-history bump classification
    pub detector: &'a dyn BumpDetector,
    /// Changelog generation
    pub changelog: &'a dyn ChangelogWriter,
    /// Lifecycle script runner
    pub hooks: HookRunner,
}

/// Mutable state threaded between stage handlers
#[derive(Default)]
struct RunState {
    pre_release_sha: Option<String>,
    plan: ReleasePlan,
    batches: Vec<Vec<Package>>,
    staged: Vec<PathBuf>,
    created_tags: Vec<String>,
    committed: bool,
    artifacts: HashMap<String, PathBuf>,
    outcome: PublishOutcome,
    rolled_back: bool,
}

/// Drives one release end to end
pub struct Orchestrator<'a> {
    ctx: ReleaseContext<'a>,
    options: ReleaseOptions,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator.
    pub fn new(ctx: ReleaseContext<'a>, options: ReleaseOptions) -> Self {
        Self { ctx, options }
    }

    /// Run the state machine to completion.
    ///
    /// Publish failures do not abort the run; they are collected into the
    /// report and the caller maps them to the exit status. Hard errors after
    /// the commit stage trigger rollback (unless disabled) before
    /// propagating.
    #[instrument(skip(self), fields(mode = %self.ctx.config.mode, packages = self.ctx.packages.len()))]
    pub fn run(self) -> Result<ReleaseReport> {
        let mut state = RunState::default();
        let mut stage = ReleaseStage::Init;

        loop {
            debug!(stage = ?stage, "entering release stage");
            let next = match stage {
                ReleaseStage::Init => self.init(&mut state),
                ReleaseStage::Verify => self.verify(&mut state),
                ReleaseStage::Plan => self.plan(&mut state),
                ReleaseStage::Confirm => self.confirm(&mut state),
                ReleaseStage::Write => self.write(&mut state),
                ReleaseStage::CommitTag => self.commit_tag(&mut state),
                ReleaseStage::Build => self.build(&mut state),
                ReleaseStage::Publish => self.publish(&mut state),
                ReleaseStage::Done => break,
                ReleaseStage::Failed => break,
            };

            stage = match next {
                Ok(next) => next,
                Err(e) => {
                    warn!(stage = ?stage, error = %e, "release stage failed");
                    if state.committed && stage >= ReleaseStage::CommitTag {
                        self.maybe_rollback(&mut state);
                    }
                    return Err(e);
                }
            };
        }

        // Canary runs always roll back, whatever the outcome
        if self.options.canary {
            self.rollback(&mut state);
        } else if !state.outcome.failed.is_empty() {
            self.maybe_rollback(&mut state);
        } else if state.committed
            && !self.options.no_push
            && self.ctx.config.push
            && !state.plan.is_empty()
        {
            self.push_release()?;
        }

        Ok(ReleaseReport {
            plan: state.plan,
            published: state.outcome.published,
            failed: state.outcome.failed,
            tags: state.created_tags,
            rolled_back: state.rolled_back,
        })
    }

    fn init(&self, state: &mut RunState) -> Result<ReleaseStage> {
        state.pre_release_sha = Some(self.ctx.vcs.head_sha()?);
        Ok(ReleaseStage::Verify)
    }

    fn verify(&self, _state: &mut RunState) -> Result<ReleaseStage> {
        if !self.options.skip_verify {
            self.ctx.registry.ping()?;
            for pkg in self.ctx.packages.iter().filter(|p| !p.private) {
                // Fail-fast: the first denied package aborts verification
                self.ctx.registry.check_access(pkg)?;
            }
        }

        if let Some(branch) = self.ctx.vcs.current_branch()? {
            match self
                .ctx
                .vcs
                .upstream_status(&self.ctx.config.remote, &branch)?
            {
                UpstreamStatus::Current => {}
                UpstreamStatus::Behind(behind) => {
                    // Fatal for a human, warning for a pipeline
                    if self.options.ci {
                        warn!(
                            branch = %branch,
                            behind,
                            "branch is behind its remote; continuing in CI mode"
                        );
                    } else {
                        return Err(GitError::BehindRemote { branch, behind }.into());
                    }
                }
                UpstreamStatus::NoUpstream => {
                    if self.options.ci {
                        warn!(branch = %branch, "branch has no remote counterpart; continuing in CI mode");
                    } else {
                        return Err(GitError::NoRemoteBranch(branch).into());
                    }
                }
            }
        }

        Ok(ReleaseStage::Plan)
    }

    fn plan(&self, state: &mut RunState) -> Result<ReleaseStage> {
        // Cycle rejection happens here, before any side effect
        let graph = PackageGraph::build(&self.ctx.packages);
        graph.partition_cycles(self.ctx.config.reject_cycles)?;

        let since = self.ctx.vcs.latest_release_tag()?;
        let changed_files = match &since {
            Some(reference) => self.ctx.vcs.changed_files_since(reference)?,
            None => Vec::new(),
        };

        let mut ignore_globs = self.ctx.config.ignore_changes.clone();
        ignore_globs.extend(self.options.ignore_changes.iter().cloned());

        let collector = UpdateCollector::new(
            self.ctx.root.clone(),
            UpdateOptions {
                since,
                forced: self.options.forced.clone(),
                include: self.options.include.clone(),
                exclude: self.options.exclude.clone(),
                ignore_globs,
            },
        )?;
        let updates = collector.collect(&graph, &changed_files);

        let interactive = self.ctx.config.mode == ReleaseMode::Independent
            && !self.options.ci
            && !self.options.yes
            && !self.options.conventional
            && self.options.bump.is_none();

        let mut resolver = VersionResolver::new(
            self.ctx.config.mode,
            self.options.bump,
            interactive,
            self.ctx.detector,
            self.ctx.prompter.as_ref(),
        );
        if let Some(version) = &self.options.explicit_version {
            resolver = resolver.with_explicit_version(version.clone());
        }
        state.plan = resolver.resolve(&updates)?;

        if state.plan.is_empty() {
            info!("no packages qualify for release");
            return Ok(ReleaseStage::Done);
        }

        // Batch only the packages actually being released
        let planned: Vec<Package> = self
            .ctx
            .packages
            .iter()
            .filter(|p| state.plan.get(&p.name).is_some())
            .cloned()
            .collect();
        let release_graph = PackageGraph::build(&planned);
        state.batches = build_batches(release_graph, false)?;

        info!(planned = state.plan.len(), batches = state.batches.len(), "release planned");
        Ok(ReleaseStage::Confirm)
    }

    fn confirm(&self, state: &mut RunState) -> Result<ReleaseStage> {
        if !self.options.yes {
            let summary: Vec<String> = state
                .plan
                .iter()
                .map(|p| format!("{}: {} => {}", p.name, p.current_version, p.next_version))
                .collect();
            let prompt = format!(
                "Release {} package(s)?\n  {}",
                state.plan.len(),
                summary.join("\n  ")
            );
            if !self.ctx.prompter.confirm(&prompt)? {
                return Err(WorkflowError::Cancelled.into());
            }
        }
        Ok(ReleaseStage::Write)
    }

    fn write(&self, state: &mut RunState) -> Result<ReleaseStage> {
        let sibling_versions = state.plan.next_versions();

        for planned in state.plan.iter() {
            let Some(pkg) = self.ctx.packages.iter().find(|p| p.name == planned.name) else {
                continue;
            };

            pkg.write_versions(&planned.next_version, &sibling_versions)?;
            state.staged.push(pkg.manifest_path.clone());
            let lockfile = pkg.location.join(crate::package::LOCKFILE);
            if lockfile.exists() {
                state.staged.push(lockfile);
            }

            let written = self.ctx.changelog.update_package(pkg, planned)?;
            state.staged.extend(written);
        }

        let written = self.ctx.changelog.update_root(&state.plan)?;
        state.staged.extend(written);

        info!(files = state.staged.len(), "wrote manifests and changelogs");
        Ok(ReleaseStage::CommitTag)
    }

    fn commit_tag(&self, state: &mut RunState) -> Result<ReleaseStage> {
        let next = if self.options.skip_publish {
            ReleaseStage::Done
        } else {
            ReleaseStage::Build
        };

        if self.options.no_git || self.options.canary {
            debug!("skipping commit and tags");
            return Ok(next);
        }

        let (subject, body) = self.commit_message(&state.plan);
        self.ctx.vcs.stage_and_commit(&state.staged, &subject, &body)?;
        state.committed = true;

        for tag in self.release_tags(&state.plan) {
            self.ctx.vcs.create_tag(&tag.0, &tag.1)?;
            state.created_tags.push(tag.0);
        }

        info!(tags = state.created_tags.len(), "created release commit and tags");
        Ok(next)
    }

    fn build(&self, state: &mut RunState) -> Result<ReleaseStage> {
        for batch in &state.batches {
            for pkg in batch {
                if pkg.private {
                    continue;
                }
                // Hooks run strictly before packing so a dependency's build
                // output exists before any dependent packs
                self.ctx.hooks.run_lifecycle(pkg, "prepublish")?;
                self.ctx.hooks.run_lifecycle(pkg, "prepack")?;
                let tarball = self.ctx.registry.pack(pkg)?;
                state.artifacts.insert(pkg.name.clone(), tarball);
            }
        }
        info!(artifacts = state.artifacts.len(), "packed artifacts");
        Ok(ReleaseStage::Publish)
    }

    fn publish(&self, state: &mut RunState) -> Result<ReleaseStage> {
        let dist_tags: HashMap<String, String> = state
            .plan
            .iter()
            .map(|p| (p.name.clone(), self.dist_tag_for(&p.next_version)))
            .collect();

        let concurrency = self
            .options
            .concurrency
            .unwrap_or(self.ctx.config.concurrency);

        state.outcome = publish_batches(
            &state.batches,
            &state.artifacts,
            &dist_tags,
            self.ctx.registry.clone(),
            self.ctx.prompter.clone(),
            self.options.otp.clone(),
            concurrency,
        )?;

        Ok(ReleaseStage::Done)
    }

    /// Distribution tag for one released version: explicit flag, canary tag,
    /// prerelease-derived tag, or the configured default.
    fn dist_tag_for(&self, version: &Version) -> String {
        if let Some(tag) = &self.options.dist_tag {
            return tag.clone();
        }
        if self.options.canary {
            return "canary".to_string();
        }
        if !version.pre.is_empty() {
            return "next".to_string();
        }
        self.ctx.config.dist_tag.clone()
    }

    /// Commit subject/body with `%v` substituted by the release summary.
    fn commit_message(&self, plan: &ReleasePlan) -> (String, String) {
        let summary = match self.ctx.config.mode {
            ReleaseMode::Fixed => plan
                .iter()
                .next()
                .map(|p| format!("v{}", p.next_version))
                .unwrap_or_default(),
            ReleaseMode::Independent => format!("{} package(s)", plan.len()),
        };
        let subject = self.ctx.config.message.replace("%v", &summary);

        let body = plan
            .iter()
            .map(|p| format!("- {}@{}", p.name, p.next_version))
            .collect::<Vec<_>>()
            .join("\n");

        (subject, body)
    }

    /// Tag names for the plan: one shared tag in fixed mode, one per package
    /// in independent mode.
    fn release_tags(&self, plan: &ReleasePlan) -> Vec<(String, String)> {
        match self.ctx.config.mode {
            ReleaseMode::Fixed => plan
                .iter()
                .next()
                .map(|p| {
                    let version = p.next_version.to_string();
                    vec![(
                        self.ctx.config.fixed_tag(&version),
                        format!("Release {}", version),
                    )]
                })
                .unwrap_or_default(),
            ReleaseMode::Independent => plan
                .iter()
                .map(|p| {
                    let version = p.next_version.to_string();
                    (
                        self.ctx.config.package_tag(&p.name, &version),
                        format!("Release {}@{}", p.name, version),
                    )
                })
                .collect(),
        }
    }

    fn maybe_rollback(&self, state: &mut RunState) {
        if self.options.no_rollback {
            warn!("publish failed but rollback is disabled; leaving release commit in place");
            return;
        }
        self.rollback(state);
    }

    /// Restore the pre-release state: hard reset to the recorded SHA and
    /// remove every tag this run created.
    fn rollback(&self, state: &mut RunState) {
        let Some(sha) = &state.pre_release_sha else {
            return;
        };

        info!(sha = %sha, tags = state.created_tags.len(), "rolling back release");
        if let Err(e) = self.ctx.vcs.reset_hard(sha) {
            warn!(error = %e, "rollback reset failed");
        }
        for tag in state.created_tags.drain(..) {
            if let Err(e) = self.ctx.vcs.delete_tag(&tag) {
                warn!(tag = %tag, error = %e, "failed to delete tag during rollback");
            }
        }
        state.committed = false;
        state.rolled_back = true;
    }

    fn push_release(&self) -> Result<()> {
        if let Some(branch) = self.ctx.vcs.current_branch()? {
            self.ctx
                .vcs
                .push(&self.ctx.config.remote, &branch, true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use crate::graph::testutil::package;
    use crate::versioning::FixedDetector;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Vcs stub recording every mutating call
    #[derive(Default)]
    struct RecordingVcs {
        events: Mutex<Vec<String>>,
        tags: Mutex<Vec<String>>,
        behind: Option<usize>,
    }

    impl Vcs for RecordingVcs {
        fn head_sha(&self) -> Result<String> {
            Ok("pre-release-sha".to_string())
        }

        fn current_branch(&self) -> Result<Option<String>> {
            Ok(Some("main".to_string()))
        }

        fn upstream_status(&self, _remote: &str, _branch: &str) -> Result<UpstreamStatus> {
            Ok(match self.behind {
                Some(n) => UpstreamStatus::Behind(n),
                None => UpstreamStatus::Current,
            })
        }

        fn latest_release_tag(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn changed_files_since(&self, _reference: &str) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }

        fn stage_and_commit(&self, _paths: &[PathBuf], subject: &str, _body: &str) -> Result<String> {
            self.events.lock().unwrap().push(format!("commit:{}", subject));
            Ok("release-sha".to_string())
        }

        fn create_tag(&self, name: &str, _message: &str) -> Result<()> {
            self.events.lock().unwrap().push(format!("tag:{}", name));
            self.tags.lock().unwrap().push(name.to_string());
            Ok(())
        }

        fn delete_tag(&self, name: &str) -> Result<()> {
            self.events.lock().unwrap().push(format!("untag:{}", name));
            self.tags.lock().unwrap().retain(|t| t != name);
            Ok(())
        }

        fn reset_hard(&self, sha: &str) -> Result<()> {
            self.events.lock().unwrap().push(format!("reset:{}", sha));
            Ok(())
        }

        fn push(&self, remote: &str, branch: &str, _follow_tags: bool) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("push:{}/{}", remote, branch));
            Ok(())
        }
    }

    /// Registry stub failing the packages named in `fail`
    struct ScriptedRegistry {
        fail: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRegistry {
        fn new(fail: &[&str]) -> Self {
            Self {
                fail: fail.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl RegistryClient for ScriptedRegistry {
        fn ping(&self) -> std::result::Result<(), PublishError> {
            Ok(())
        }

        fn check_access(&self, _package: &Package) -> std::result::Result<(), PublishError> {
            Ok(())
        }

        fn pack(&self, package: &Package) -> std::result::Result<PathBuf, PublishError> {
            Ok(package.location.join("pkg.tgz"))
        }

        fn publish(
            &self,
            package: &Package,
            _tarball: &Path,
            _dist_tag: &str,
            _otp: Option<&str>,
        ) -> std::result::Result<(), PublishError> {
            self.calls.lock().unwrap().push(package.name.clone());
            if self.fail.contains(&package.name) {
                return Err(PublishError::UploadFailed {
                    package: package.name.clone(),
                    reason: "registry exploded".to_string(),
                });
            }
            Ok(())
        }
    }

    fn workspace(names: &[&str]) -> (TempDir, Vec<Package>) {
        let temp = TempDir::new().unwrap();
        let packages = names
            .iter()
            .map(|name| {
                let dir = temp.path().join("packages").join(name);
                std::fs::create_dir_all(&dir).unwrap();
                std::fs::write(
                    dir.join("package.json"),
                    format!(r#"{{"name": "{}", "version": "1.0.0"}}"#, name),
                )
                .unwrap();
                let mut pkg = package(name, "1.0.0", &[]);
                pkg.location = dir.clone();
                pkg.manifest_path = dir.join("package.json");
                pkg
            })
            .collect();
        (temp, packages)
    }

    struct Fixture {
        root: PathBuf,
        config: Config,
        packages: Vec<Package>,
        vcs: RecordingVcs,
        registry: Arc<ScriptedRegistry>,
        detector: FixedDetector,
    }

    impl Fixture {
        fn new(temp: &TempDir, packages: Vec<Package>, fail: &[&str]) -> Self {
            Self {
                root: temp.path().to_path_buf(),
                config: Config::default(),
                packages,
                vcs: RecordingVcs::default(),
                registry: Arc::new(ScriptedRegistry::new(fail)),
                detector: FixedDetector(BumpLevel::Minor),
            }
        }

        fn run(&self, options: ReleaseOptions) -> Result<ReleaseReport> {
            let ctx = ReleaseContext {
                root: self.root.clone(),
                config: &self.config,
                packages: self.packages.clone(),
                vcs: &self.vcs,
                registry: self.registry.clone(),
                prompter: Arc::new(crate::prompt::NonInteractive),
                detector: &self.detector,
                changelog: &NoChangelog,
                hooks: HookRunner::new(self.root.clone(), BTreeMap::new()),
            };
            Orchestrator::new(ctx, options).run()
        }

        fn events(&self) -> Vec<String> {
            self.vcs.events.lock().unwrap().clone()
        }
    }

    fn yes_options() -> ReleaseOptions {
        ReleaseOptions {
            yes: true,
            conventional: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_happy_path_publishes_everything() {
        let (temp, packages) = workspace(&["alpha", "beta", "gamma"]);
        let fixture = Fixture::new(&temp, packages, &[]);

        let report = fixture.run(yes_options()).unwrap();

        assert!(report.success());
        assert_eq!(report.published.len(), 3);
        assert!(!report.rolled_back);
        assert_eq!(report.tags.len(), 3);

        // Release commit happened and was pushed
        let events = fixture.events();
        assert!(events.iter().any(|e| e.starts_with("commit:")));
        assert!(events.iter().any(|e| e == "push:origin/main"));
        assert!(!events.iter().any(|e| e.starts_with("reset:")));
    }

    #[test]
    fn test_partial_publish_reports_and_exits_nonzero() {
        let (temp, packages) = workspace(&["one", "three", "two"]);
        let fixture = Fixture::new(&temp, packages, &["two"]);

        let options = ReleaseOptions {
            no_rollback: true,
            ..yes_options()
        };
        let report = fixture.run(options).unwrap();

        // one and three published, two failed, run not successful
        assert!(!report.success());
        let mut published = report.published.clone();
        published.sort();
        assert_eq!(published, vec!["one", "three"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "two");

        // Successful uploads were attempted exactly once, never retried
        let calls = fixture.registry.calls.lock().unwrap().clone();
        assert_eq!(calls.iter().filter(|c| *c == "one").count(), 1);
        assert_eq!(calls.iter().filter(|c| *c == "three").count(), 1);

        // Rollback disabled: no reset, and not pushed either
        let events = fixture.events();
        assert!(!events.iter().any(|e| e.starts_with("reset:")));
        assert!(!events.iter().any(|e| e.starts_with("push:")));
    }

    #[test]
    fn test_rollback_restores_pre_release_state() {
        let (temp, packages) = workspace(&["solo"]);
        let fixture = Fixture::new(&temp, packages, &["solo"]);

        let report = fixture.run(yes_options()).unwrap();

        assert!(!report.success());
        assert!(report.rolled_back);
        // Tags created by the run were removed again
        assert!(report.tags.is_empty());
        assert!(fixture.vcs.tags.lock().unwrap().is_empty());

        let events = fixture.events();
        assert!(events.iter().any(|e| e == "reset:pre-release-sha"));
        assert!(events.iter().any(|e| e.starts_with("untag:")));
    }

    #[test]
    fn test_canary_always_rolls_back_and_skips_commit() {
        let (temp, packages) = workspace(&["solo"]);
        let fixture = Fixture::new(&temp, packages, &[]);

        let options = ReleaseOptions {
            canary: true,
            ..yes_options()
        };
        let report = fixture.run(options).unwrap();

        assert!(report.success());
        assert!(report.rolled_back);

        let events = fixture.events();
        assert!(!events.iter().any(|e| e.starts_with("commit:")));
        assert!(!events.iter().any(|e| e.starts_with("tag:")));
        assert!(events.iter().any(|e| e == "reset:pre-release-sha"));
    }

    #[test]
    fn test_behind_upstream_fatal_interactive_warning_in_ci() {
        let (temp, packages) = workspace(&["solo"]);
        let mut fixture = Fixture::new(&temp, packages, &[]);
        fixture.vcs.behind = Some(2);

        // Interactive: fatal before any side effect
        let err = fixture.run(yes_options()).unwrap_err();
        assert!(err.to_string().contains("behind"));
        assert!(fixture.events().is_empty());

        // CI: warning only, run proceeds
        let options = ReleaseOptions {
            ci: true,
            ..yes_options()
        };
        let report = fixture.run(options).unwrap();
        assert!(report.success());
    }

    #[test]
    fn test_declined_confirmation_cancels_before_writes() {
        struct Decliner;
        impl Prompter for Decliner {
            fn confirm(&self, _prompt: &str) -> Result<bool> {
                Ok(false)
            }
            fn select_one(&self, _prompt: &str, _options: &[&str]) -> Result<usize> {
                Ok(0)
            }
            fn text_input(&self, _prompt: &str) -> Result<String> {
                unreachable!()
            }
        }

        let (temp, packages) = workspace(&["solo"]);
        let fixture = Fixture::new(&temp, packages.clone(), &[]);

        let ctx = ReleaseContext {
            root: fixture.root.clone(),
            config: &fixture.config,
            packages,
            vcs: &fixture.vcs,
            registry: fixture.registry.clone(),
            prompter: Arc::new(Decliner),
            detector: &fixture.detector,
            changelog: &NoChangelog,
            hooks: HookRunner::new(fixture.root.clone(), BTreeMap::new()),
        };
        let options = ReleaseOptions {
            conventional: true,
            ..Default::default()
        };
        let err = Orchestrator::new(ctx, options).run().unwrap_err();
        assert!(matches!(
            err,
            crate::error::ConvoyError::Workflow(WorkflowError::Cancelled)
        ));

        // Manifest untouched
        let manifest = std::fs::read_to_string(
            temp.path().join("packages/solo/package.json"),
        )
        .unwrap();
        assert!(manifest.contains("1.0.0"));
    }

    #[test]
    fn test_empty_plan_short_circuits() {
        let (temp, packages) = workspace(&["solo"]);
        let mut fixture = Fixture::new(&temp, packages, &[]);
        fixture.detector = FixedDetector(BumpLevel::None);

        let report = fixture.run(yes_options()).unwrap();
        assert!(report.plan.is_empty());
        assert!(report.published.is_empty());
        assert!(fixture.events().is_empty());
    }

    #[test]
    fn test_write_stage_updates_manifests() {
        let (temp, packages) = workspace(&["solo"]);
        let fixture = Fixture::new(&temp, packages, &[]);

        let report = fixture.run(yes_options()).unwrap();
        assert!(report.success());

        let manifest = std::fs::read_to_string(
            temp.path().join("packages/solo/package.json"),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(value["version"], "1.1.0");
    }
}
