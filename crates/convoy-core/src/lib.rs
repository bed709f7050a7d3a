//! Convoy Core - Core library for monorepo release management
//!
//! This crate provides the workspace package model, the dependency graph
//! engine (cycle clustering and topological batching), update collection,
//! version resolution, and the release orchestrator.

pub mod changes;
pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod package;
pub mod prompt;
pub mod registry;
pub mod release;
pub mod types;
pub mod versioning;

pub use changes::{Update, UpdateCollector, UpdateOptions, UpdateReason};
pub use config::Config;
pub use error::{ConvoyError, Result};
pub use graph::batches::build_batches;
pub use graph::cycles::merge_overlapping_cycles;
pub use graph::PackageGraph;
pub use package::{Package, PackageLoader};
pub use prompt::{NonInteractive, Prompter};
pub use registry::{NpmClient, RegistryClient};
pub use release::{
    ChangelogWriter, NoChangelog, Orchestrator, ReleaseContext, ReleaseOptions, ReleaseReport,
    ReleaseStage, UpstreamStatus, Vcs,
};
pub use types::{BumpLevel, DependencyKind, ReleaseMode};
pub use versioning::{BumpDetector, PlannedRelease, ReleasePlan, VersionResolver};
