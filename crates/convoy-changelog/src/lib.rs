//! Convoy Changelog - Conventional-commit parsing and changelog generation
//!
//! This crate turns commit history into bump classifications and markdown
//! changelog entries, and implements the release pipeline's commit-analysis
//! and changelog-writing capabilities.

mod bump;
mod conventional;
mod generator;
mod writer;
pub mod types;

pub use bump::ConventionalBumpDetector;
pub use conventional::ConventionalParser;
pub use generator::{render_entry, update_changelog};
pub use types::{classify_commits, ParsedCommit, Section};
pub use writer::FileChangelogWriter;
