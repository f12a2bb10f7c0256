//! Outcome of one pipeline run

use serde::Serialize;

use crate::entity::{EntityKind, SnapshotDate};
use crate::ingest::IngestStats;

/// How one entity kind fared
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum KindOutcome {
    /// File processed; individual records may still have failed
    Completed(IngestStats),
    /// The kind could not be processed at all
    Failed { error: String },
}

impl KindOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, KindOutcome::Completed(_))
    }

    pub fn stats(&self) -> Option<&IngestStats> {
        match self {
            KindOutcome::Completed(stats) => Some(stats),
            KindOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KindReport {
    pub kind: EntityKind,
    pub outcome: KindOutcome,
}

/// Report from running every selected kind for one snapshot date
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub data_date: SnapshotDate,
    pub kinds: Vec<KindReport>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Every selected kind completed
    pub fn is_success(&self) -> bool {
        self.kinds.iter().all(|k| k.outcome.is_completed())
    }

    pub fn completed_count(&self) -> usize {
        self.kinds.iter().filter(|k| k.outcome.is_completed()).count()
    }

    pub fn failed_kinds(&self) -> Vec<EntityKind> {
        self.kinds
            .iter()
            .filter(|k| !k.outcome.is_completed())
            .map(|k| k.kind)
            .collect()
    }

    /// Records written across all kinds
    pub fn total_success(&self) -> usize {
        self.kinds
            .iter()
            .filter_map(|k| k.outcome.stats())
            .map(|s| s.success)
            .sum()
    }

    /// Record-level errors across all kinds
    pub fn total_errors(&self) -> usize {
        self.kinds
            .iter()
            .filter_map(|k| k.outcome.stats())
            .map(|s| s.errors)
            .sum()
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}s", secs)
        }
    }
}
