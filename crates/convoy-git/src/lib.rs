//! Convoy Git - Git operations for release management
//!
//! This crate provides the repository wrapper used by the release pipeline:
//! commit history with per-package filtering, tag management, changed-path
//! diffs, upstream checks, and the commit/reset/push operations behind the
//! orchestrator's version-control capability.

mod commits;
mod diff;
mod ops;
mod repository;
mod status;
mod tags;
pub mod types;
mod vcs;

pub use ops::git_push;
pub use repository::{GitRepo, Result};
pub use types::{CommitInfo, TagInfo};
