//! Dated dump checkpoints

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::entity::SnapshotDate;

use super::error::WalkError;

static DUMP_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"dump-(\d{4}-\d{2}-\d{2})\.").unwrap());

/// Date carried by a dump commit message such as `Update dump-2024-02-01.zip`
pub fn parse_dump_label(message: &str) -> Option<SnapshotDate> {
    let captures = DUMP_LABEL.captures(message)?;
    let raw = captures.get(1)?.as_str();
    match SnapshotDate::parse(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(label = raw, error = %e, "Dump label is not a calendar date");
            None
        }
    }
}

/// One historical snapshot of the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotCheckpoint {
    /// Commit (or other version) identifier
    pub commit: String,
    pub date: SnapshotDate,
    /// The message the date was read from
    pub label: String,
}

impl SnapshotCheckpoint {
    /// Build a checkpoint when the message carries a dump label
    pub fn from_commit(commit: impl Into<String>, message: &str) -> Option<Self> {
        parse_dump_label(message).map(|date| Self {
            commit: commit.into(),
            date,
            label: message.trim().to_string(),
        })
    }

    /// First 8 characters of the commit id
    pub fn short_id(&self) -> &str {
        let end = self
            .commit
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.commit.len());
        &self.commit[..end]
    }
}

/// Oldest first, one checkpoint per date
///
/// `checkpoints` must be in history order. The sort is stable, and when a
/// date repeats the most recent commit carrying it wins.
pub fn order_checkpoints(checkpoints: Vec<SnapshotCheckpoint>) -> Vec<SnapshotCheckpoint> {
    let mut latest: HashMap<SnapshotDate, usize> = HashMap::new();
    for (index, checkpoint) in checkpoints.iter().enumerate() {
        if let Some(previous) = latest.insert(checkpoint.date, index) {
            warn!(
                date = %checkpoint.date,
                superseded = %checkpoints[previous].short_id(),
                kept = %checkpoint.short_id(),
                "Repeated dump label, keeping the most recent commit"
            );
        }
    }

    let mut ordered: Vec<SnapshotCheckpoint> = checkpoints
        .into_iter()
        .enumerate()
        .filter(|(index, cp)| latest.get(&cp.date) == Some(index))
        .map(|(_, cp)| cp)
        .collect();
    ordered.sort_by_key(|cp| cp.date);
    ordered
}

/// Index of the checkpoint a walk starts from
pub fn start_index(
    checkpoints: &[SnapshotCheckpoint],
    start: Option<SnapshotDate>,
) -> Result<usize, WalkError> {
    match start {
        None => Ok(0),
        Some(date) => checkpoints
            .iter()
            .position(|cp| cp.date == date)
            .ok_or(WalkError::StartNotFound(date)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(commit: &str, date: &str) -> SnapshotCheckpoint {
        SnapshotCheckpoint::from_commit(commit, &format!("dump-{date}.zip")).unwrap()
    }

    #[test]
    fn test_parse_dump_label() {
        assert_eq!(
            parse_dump_label("Update dump-2024-02-01.zip").map(|d| d.to_string()),
            Some("2024-02-01".to_string())
        );
        assert!(parse_dump_label("dump-2024-02-01").is_none());
        assert!(parse_dump_label("initial commit").is_none());
        assert!(parse_dump_label("dump-2024-02-30.zip").is_none());
    }

    #[test]
    fn test_order_and_dedupe() {
        let ordered = order_checkpoints(vec![
            cp("aaa", "2024-01-01"),
            cp("bbb", "2024-03-01"),
            cp("ccc", "2024-02-01"),
            cp("ddd", "2024-01-01"),
        ]);
        let commits: Vec<&str> = ordered.iter().map(|c| c.commit.as_str()).collect();
        assert_eq!(commits, vec!["ddd", "ccc", "bbb"]);
    }

    #[test]
    fn test_start_index() {
        let list = vec![cp("a", "2024-01-01"), cp("b", "2024-02-01")];
        assert_eq!(start_index(&list, None).unwrap(), 0);
        assert_eq!(
            start_index(&list, Some(SnapshotDate::parse("2024-02-01").unwrap())).unwrap(),
            1
        );
        assert!(matches!(
            start_index(&list, Some(SnapshotDate::parse("2024-01-15").unwrap())),
            Err(WalkError::StartNotFound(_))
        ));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(cp("0123456789abcdef", "2024-01-01").short_id(), "01234567");
        assert_eq!(cp("abc", "2024-01-01").short_id(), "abc");
    }
}
