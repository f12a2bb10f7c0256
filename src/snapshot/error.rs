//! Error types for snapshot walks

use thiserror::Error;

use crate::entity::SnapshotDate;

/// Errors that end a walk
#[derive(Error, Debug)]
pub enum WalkError {
    /// The history could not be read
    #[error("Checkpoint discovery failed: {0}")]
    Discovery(String),

    /// History holds no dump commits
    #[error("No dump checkpoints found")]
    NoCheckpoints,

    /// Requested start date has no checkpoint
    #[error("No checkpoint found for start date {0}")]
    StartNotFound(SnapshotDate),

    /// A checkpoint could not be materialised
    #[error("Failed to activate checkpoint {commit}: {reason}")]
    Activation { commit: String, reason: String },

    /// Materialised files could not be removed
    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

impl WalkError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            WalkError::NoCheckpoints => "No dump checkpoints found.\n\n\
                Hint: Commit messages must contain 'dump-YYYY-MM-DD.'; check ARCHIVE_DIR and ARCHIVE_BRANCH."
                .to_string(),
            WalkError::StartNotFound(date) => format!(
                "No checkpoint found for start date {date}.\n\n\
                Hint: DATA_START_DATE must match the date of an existing dump commit."
            ),
            WalkError::Activation { commit, reason } => format!(
                "Could not check out {commit}: {reason}\n\n\
                Hint: Make sure the archive working tree is not locked by another git process."
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(feature = "git")]
impl From<git2::Error> for WalkError {
    fn from(err: git2::Error) -> Self {
        WalkError::Discovery(err.message().to_string())
    }
}
