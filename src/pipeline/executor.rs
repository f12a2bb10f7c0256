//! Runs entity kinds for one snapshot date

use std::time::Instant;

use tracing::{error, info, info_span, warn};

use crate::config::ArchiveConfig;
use crate::entity::{EntityKind, SnapshotDate, processor_for};
use crate::ingest::{BatchEngine, DEFAULT_BATCH_SIZE, IngestError, IngestStats};
use crate::store::Connector;

use super::report::{KindOutcome, KindReport, PipelineReport};

/// Ingestion of the archive's current working tree
///
/// Single-pass runs call [`Pipeline::run`] once; the snapshot walker calls it
/// once per checkpoint with that checkpoint's date.
pub struct Pipeline<'a> {
    connector: &'a dyn Connector,
    archive: &'a ArchiveConfig,
    batch_size: usize,
    limit: Option<usize>,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(connector: &'a dyn Connector, archive: &'a ArchiveConfig) -> Self {
        Self {
            connector,
            archive,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: None,
            show_progress: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Cap the number of lines read per file
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Ingest one entity kind on a fresh connection
    ///
    /// The table is created before the input file is looked up, so a missing
    /// file still leaves the schema in place.
    pub fn run_kind(&self, kind: EntityKind, date: SnapshotDate) -> Result<IngestStats, IngestError> {
        let _span = info_span!("entity_run", kind = %kind, data_date = %date).entered();

        let path = self.archive.file_for(kind);
        info!(
            kind = %kind,
            file = %path.display(),
            target = %self.connector.describe(),
            limit = ?self.limit,
            "Processing entity file"
        );

        let mut store = self
            .connector
            .connect()
            .map_err(|source| IngestError::Connect { kind, source })?;

        let processor = processor_for(kind);
        processor
            .ensure_schema(store.as_mut())
            .map_err(|source| IngestError::Schema { kind, source })?;

        if !path.exists() {
            return Err(IngestError::FileNotFound(path));
        }

        let engine = BatchEngine::new(processor, date, self.batch_size)
            .with_progress(self.show_progress);
        let stats = engine.process_file(store.as_mut(), &path, self.limit)?;

        match store.count_rows(processor.table(), Some(date)) {
            Ok(rows) => info!(table = processor.table(), data_date = %date, rows, "Rows stored for snapshot"),
            Err(e) => warn!(table = processor.table(), error = %e, "Could not count stored rows"),
        }

        Ok(stats)
    }

    /// Ingest each kind in order; a failing kind never stops the others
    pub fn run(&self, kinds: &[EntityKind], date: SnapshotDate) -> PipelineReport {
        let start = Instant::now();
        let mut reports = Vec::with_capacity(kinds.len());

        for &kind in kinds {
            let outcome = match self.run_kind(kind, date) {
                Ok(stats) => KindOutcome::Completed(stats),
                Err(e) => {
                    error!(kind = %kind, data_date = %date, error = %e, "Entity processing failed");
                    KindOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(KindReport { kind, outcome });
        }

        let report = PipelineReport {
            data_date: date,
            kinds: reports,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            data_date = %date,
            completed = report.completed_count(),
            total = kinds.len(),
            success = report.total_success(),
            errors = report.total_errors(),
            duration = %report.duration_formatted(),
            "Snapshot processed"
        );

        report
    }
}
