//! Dump archive stored as a git repository
//!
//! Every dump is a commit on one branch whose summary names the dump file,
//! e.g. `Update dump-2024-02-01.zip`. Checking a commit out materialises that
//! dump's JSONL files in the working tree.

use std::fs;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Oid, Repository, Sort};
use tracing::{debug, info};

use crate::config::ArchiveConfig;
use crate::entity::SnapshotDate;

use super::checkpoint::{SnapshotCheckpoint, parse_dump_label};
use super::error::WalkError;
use super::walker::SnapshotSource;

/// Git-backed snapshot source
pub struct GitArchive {
    repo: Repository,
    branch: String,
    data_files: Vec<PathBuf>,
}

impl GitArchive {
    /// Open the archive repository described by `archive`
    pub fn open(archive: &ArchiveConfig) -> Result<Self, WalkError> {
        Self::open_at(&archive.dir, &archive.branch, archive.data_files())
    }

    /// Open a repository at `dir`, walking `branch` and managing `data_files`
    pub fn open_at(dir: &Path, branch: &str, data_files: Vec<PathBuf>) -> Result<Self, WalkError> {
        let repo = Repository::open(dir).map_err(|e| {
            WalkError::Discovery(format!("cannot open repository {}: {}", dir.display(), e.message()))
        })?;
        if repo.is_bare() {
            return Err(WalkError::Discovery(format!(
                "repository {} has no working tree",
                dir.display()
            )));
        }

        info!(path = %dir.display(), branch, "Opened dump archive");
        Ok(Self {
            repo,
            branch: branch.to_string(),
            data_files,
        })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Dump date named by the HEAD commit, if it carries a label
    pub fn head_dump_date(&self) -> Result<Option<SnapshotDate>, WalkError> {
        let head = self.repo.head()?.peel_to_commit()?;
        let message = head.message().unwrap_or_default();
        Ok(parse_dump_label(message))
    }

    fn remove_data_files(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for path in &self.data_files {
            if path.exists() {
                fs::remove_file(path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn activation_error(commit: &str, reason: impl ToString) -> WalkError {
        WalkError::Activation {
            commit: commit.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl SnapshotSource for GitArchive {
    fn discover_checkpoints(&self) -> Result<Vec<SnapshotCheckpoint>, WalkError> {
        let tip = self
            .repo
            .revparse_single(&self.branch)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| {
                WalkError::Discovery(format!("cannot resolve branch '{}': {}", self.branch, e.message()))
            })?;

        let mut walk = self.repo.revwalk()?;
        walk.push(tip.id())?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;

        let mut checkpoints = Vec::new();
        let mut skipped = 0usize;
        for oid in walk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            let summary = commit.summary().unwrap_or_default();
            match SnapshotCheckpoint::from_commit(oid.to_string(), summary) {
                Some(checkpoint) => checkpoints.push(checkpoint),
                None => {
                    debug!(commit = %oid, summary, "Skipping commit without dump label");
                    skipped += 1;
                }
            }
        }

        info!(
            branch = %self.branch,
            checkpoints = checkpoints.len(),
            skipped,
            "Discovered dump checkpoints"
        );
        Ok(checkpoints)
    }

    fn activate(&mut self, checkpoint: &SnapshotCheckpoint) -> Result<(), WalkError> {
        let commit_id = checkpoint.commit.as_str();

        self.remove_data_files()
            .map_err(|e| Self::activation_error(commit_id, e))?;

        let oid = Oid::from_str(commit_id).map_err(|e| Self::activation_error(commit_id, e))?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| Self::activation_error(commit_id, e))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| Self::activation_error(commit_id, e))?;
        self.repo
            .set_head_detached(oid)
            .map_err(|e| Self::activation_error(commit_id, e))?;

        info!(commit = %checkpoint.short_id(), data_date = %checkpoint.date, "Checked out dump");
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), WalkError> {
        let removed = self
            .remove_data_files()
            .map_err(|e| WalkError::Cleanup(e.to_string()))?;
        debug!(removed, "Removed materialised data files");
        Ok(())
    }
}
