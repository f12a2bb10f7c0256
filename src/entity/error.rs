//! Per-record extraction errors

use thiserror::Error;

/// A record passed validation but one of its fields cannot be stored
///
/// These errors are absorbed by the batch engine and counted against the
/// record; they never abort a batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// Required field absent or null
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// Field present but not convertible to its column type
    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ExtractError {
    pub(crate) fn invalid(field: &'static str, value: &serde_json::Value, reason: &'static str) -> Self {
        ExtractError::InvalidField {
            field,
            value: value.to_string(),
            reason,
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ExtractError::MissingField(field) => field,
            ExtractError::InvalidField { field, .. } => field,
        }
    }
}
