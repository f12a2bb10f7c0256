//! Errors surfaced by the command-line front end

use thiserror::Error;

use archive_stats::{ConfigError, WalkError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Walk(#[from] WalkError),
}

impl CliError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(e) => e.user_message(),
            CliError::Walk(e) => e.user_message(),
        }
    }
}
