//! Changed-path detection

use std::path::PathBuf;

use tracing::debug;

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// Paths changed between a reference (tag or commit) and the current
    /// state of the working tree, relative to the repository root.
    pub fn changed_files_since(&self, reference: &str) -> Result<Vec<PathBuf>> {
        let tree = self.repo.revparse_single(reference)?.peel_to_tree()?;

        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&tree), None)?;

        let mut files: Vec<PathBuf> = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.to_path_buf())
            })
            .collect();

        files.sort();
        files.dedup();

        debug!(reference, changed = files.len(), "computed changed paths");
        Ok(files)
    }
}
