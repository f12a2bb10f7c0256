//! Ordered replay of dated checkpoints

use serde::Serialize;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::entity::SnapshotDate;
use crate::pipeline::PipelineReport;

use super::checkpoint::{SnapshotCheckpoint, order_checkpoints, start_index};
use super::error::WalkError;

/// Where checkpoints come from and how they are materialised
pub trait SnapshotSource {
    /// Every checkpoint, in history order (oldest first)
    fn discover_checkpoints(&self) -> Result<Vec<SnapshotCheckpoint>, WalkError>;

    /// Make the checkpoint's files the current input files
    fn activate(&mut self, checkpoint: &SnapshotCheckpoint) -> Result<(), WalkError>;

    /// Remove whatever `activate` materialised
    fn deactivate(&mut self) -> Result<(), WalkError>;
}

/// Walker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WalkState {
    Idle,
    Activating,
    Ingesting,
    Deactivating,
    Done,
}

/// Keeps a checkpoint active; deactivates on every exit path
struct Activation<'w, S: SnapshotSource> {
    source: &'w mut S,
    state: &'w mut WalkState,
}

impl<S: SnapshotSource> Drop for Activation<'_, S> {
    fn drop(&mut self) {
        *self.state = WalkState::Deactivating;
        if let Err(e) = self.source.deactivate() {
            warn!(error = %e, "Deactivation failed");
        }
    }
}

/// Visited checkpoints of one walk
#[derive(Debug, Clone, Serialize)]
pub struct WalkReport {
    /// Correlates log lines of one walk
    pub run_id: String,
    pub checkpoints: Vec<(SnapshotCheckpoint, PipelineReport)>,
}

impl WalkReport {
    /// Every checkpoint ingested every kind
    pub fn is_success(&self) -> bool {
        self.checkpoints.iter().all(|(_, report)| report.is_success())
    }

    /// Checkpoints where at least one kind failed
    pub fn partial_failures(&self) -> Vec<&SnapshotCheckpoint> {
        self.checkpoints
            .iter()
            .filter(|(_, report)| !report.is_success())
            .map(|(cp, _)| cp)
            .collect()
    }
}

/// Replays checkpoints oldest first, one at a time
pub struct SnapshotWalker<S: SnapshotSource> {
    source: S,
    state: WalkState,
}

impl<S: SnapshotSource> SnapshotWalker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: WalkState::Idle,
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Checkpoints a walk from `start` would visit
    pub fn plan(&self, start: Option<SnapshotDate>) -> Result<Vec<SnapshotCheckpoint>, WalkError> {
        let checkpoints = order_checkpoints(self.source.discover_checkpoints()?);
        if checkpoints.is_empty() {
            return Err(WalkError::NoCheckpoints);
        }
        let first = start_index(&checkpoints, start)?;
        Ok(checkpoints[first..].to_vec())
    }

    /// Activate one checkpoint, ingest it, deactivate it
    pub fn run_one<F>(
        &mut self,
        checkpoint: &SnapshotCheckpoint,
        ingest: &mut F,
    ) -> Result<PipelineReport, WalkError>
    where
        F: FnMut(SnapshotDate) -> PipelineReport,
    {
        self.state = WalkState::Activating;
        let guard = Activation {
            source: &mut self.source,
            state: &mut self.state,
        };

        guard.source.activate(checkpoint)?;
        *guard.state = WalkState::Ingesting;
        let report = ingest(checkpoint.date);

        drop(guard);
        Ok(report)
    }

    /// Walk every checkpoint from `start` (or the oldest) to the newest
    ///
    /// A checkpoint whose ingestion partly fails is logged and the walk moves
    /// on. Failing to activate a checkpoint ends the walk.
    pub fn run<F>(&mut self, start: Option<SnapshotDate>, mut ingest: F) -> Result<WalkReport, WalkError>
    where
        F: FnMut(SnapshotDate) -> PipelineReport,
    {
        let run_id = Uuid::new_v4().to_string();
        let _span = info_span!("snapshot_walk", run_id = %run_id).entered();

        let checkpoints = match self.plan(start) {
            Ok(checkpoints) => checkpoints,
            Err(e) => {
                self.state = WalkState::Done;
                return Err(e);
            }
        };
        info!(
            run_id = %run_id,
            checkpoints = checkpoints.len(),
            from = %checkpoints[0].date,
            to = %checkpoints[checkpoints.len() - 1].date,
            "Starting snapshot walk"
        );

        let total = checkpoints.len();
        let mut visited = Vec::with_capacity(total);
        for (index, checkpoint) in checkpoints.into_iter().enumerate() {
            let _cp_span = info_span!(
                "checkpoint",
                commit = %checkpoint.short_id(),
                data_date = %checkpoint.date
            )
            .entered();
            info!(position = index + 1, total, "Activating checkpoint");

            let report = match self.run_one(&checkpoint, &mut ingest) {
                Ok(report) => report,
                Err(e) => {
                    error!(commit = %checkpoint.commit, error = %e, "Activation failed, halting walk");
                    self.state = WalkState::Done;
                    return Err(e);
                }
            };

            if !report.is_success() {
                warn!(
                    commit = %checkpoint.short_id(),
                    failed = ?report.failed_kinds(),
                    "Checkpoint partially failed"
                );
            }
            visited.push((checkpoint, report));
        }

        self.state = WalkState::Done;
        let report = WalkReport {
            run_id,
            checkpoints: visited,
        };
        info!(
            checkpoints = report.checkpoints.len(),
            partial = report.partial_failures().len(),
            "Snapshot walk complete"
        );
        Ok(report)
    }
}
