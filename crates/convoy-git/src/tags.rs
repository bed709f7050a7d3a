//! Tag operations

use regex::Regex;
use semver::Version;
use tracing::{debug, info, instrument};

use crate::repository::{GitRepo, Result};
use crate::types::TagInfo;
use convoy_core::error::GitError;

impl GitRepo {
    /// Get all tags
    pub fn tags(&self) -> Result<Vec<TagInfo>> {
        let mut tags = Vec::new();

        self.repo.tag_foreach(|oid, name| {
            let name = String::from_utf8_lossy(name)
                .trim_start_matches("refs/tags/")
                .to_string();

            if let Ok(commit) = self.repo.find_commit(oid) {
                tags.push(TagInfo::new(&name, commit.id().to_string()));
            } else if let Ok(tag) = self.repo.find_tag(oid) {
                // Annotated tag
                let mut tag_info = TagInfo::new(&name, tag.target_id().to_string());
                if let Some(msg) = tag.message() {
                    tag_info = tag_info.with_message(msg);
                }
                tags.push(tag_info);
            }

            true
        })?;

        debug!(count = tags.len(), "listed tags");
        Ok(tags)
    }

    /// Get tags whose names match a pattern
    pub fn tags_matching(&self, pattern: &str) -> Result<Vec<TagInfo>> {
        let regex = Regex::new(pattern)
            .map_err(|e| GitError::OpenFailed(format!("bad tag pattern: {}", e)))?;

        let matching = self
            .tags()?
            .into_iter()
            .filter(|t| regex.is_match(&t.name))
            .collect();

        Ok(matching)
    }

    /// Find the most recent release tag by semantic version, optionally
    /// restricted to one package's `name@version` tags.
    #[instrument(skip(self), fields(package))]
    pub fn find_latest_tag(&self, package: Option<&str>) -> Result<Option<TagInfo>> {
        let tags = self.tags()?;

        let mut versioned: Vec<(TagInfo, Version)> = tags
            .into_iter()
            .filter(|t| match package {
                Some(name) => t.name.starts_with(&format!("{}@", name)),
                None => true,
            })
            .filter_map(|t| {
                t.version
                    .as_ref()
                    .and_then(|v| Version::parse(v).ok())
                    .map(|v| (t, v))
            })
            .collect();

        versioned.sort_by(|a, b| b.1.cmp(&a.1));

        let result = versioned.into_iter().next().map(|(t, _)| t);
        debug!(latest = ?result.as_ref().map(|t| &t.name), "found latest tag");
        Ok(result)
    }

    /// Find a specific tag by name
    pub fn find_tag(&self, name: &str) -> Result<Option<TagInfo>> {
        let tag_ref = format!("refs/tags/{}", name);

        match self.repo.find_reference(&tag_ref) {
            Ok(reference) => {
                let target = reference.peel_to_commit()?;
                Ok(Some(TagInfo::new(name, target.id().to_string())))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Git2(e)),
        }
    }

    /// Create an annotated tag at HEAD
    #[instrument(skip(self), fields(name))]
    pub fn create_tag(&self, name: &str, message: &str) -> Result<TagInfo> {
        if self.find_tag(name)?.is_some() {
            return Err(GitError::TagExists(name.to_string()));
        }

        let head = self.head_commit()?;
        let sig = self.repo.signature().or_else(|_| {
            git2::Signature::now("convoy", "convoy@localhost")
        })?;
        self.repo
            .tag(name, head.as_object(), &sig, message, false)
            .map_err(|e| GitError::TagCreationFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        info!(name, "created tag");
        Ok(TagInfo::new(name, head.id().to_string()))
    }

    /// Delete a tag
    #[instrument(skip(self), fields(name))]
    pub fn delete_tag(&self, name: &str) -> Result<()> {
        self.repo.tag_delete(name)?;
        info!(name, "deleted tag");
        Ok(())
    }
}
