//! Error types for ingestion

use std::path::PathBuf;
use thiserror::Error;

use crate::entity::EntityKind;
use crate::store::StoreError;

/// Errors that can occur while ingesting one entity file
#[derive(Error, Debug)]
pub enum IngestError {
    /// Input file absent
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not open a store for this kind
    #[error("Cannot connect for {kind}: {source}")]
    Connect {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },

    /// Table or index creation failed
    #[error("Schema setup failed for {kind}: {source}")]
    Schema {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },

    /// Batch execution failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            IngestError::FileNotFound(path) => {
                format!(
                    "File not found: {}\n\nHint: Check ARCHIVE_DIR and that the dump has been checked out.",
                    path.display()
                )
            }
            IngestError::Connect { kind, source } => {
                format!("Cannot process {kind}.\n{}", source.user_message())
            }
            IngestError::Schema { kind, source } => {
                format!(
                    "Could not create the {} table: {source}\n\n\
                    Hint: Check that the database user may create tables.",
                    kind.table()
                )
            }
            _ => self.to_string(),
        }
    }
}
