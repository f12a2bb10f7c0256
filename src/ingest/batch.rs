//! Batched, transactional upserts
//!
//! Records are pulled from a reader in fixed-size chunks. Each chunk is
//! validated and extracted record by record, then written in a single
//! transaction. A failing record costs one error; a failing transaction costs
//! the whole chunk and processing moves on to the next one.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::entity::{EntityProcessor, ExtractedRow, RawRecord, SnapshotDate, fields};
use crate::store::Store;

use super::error::IngestError;
use super::progress::IngestProgress;
use super::reader::{RecordReader, count_lines};

/// Records per transaction unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Result of one committed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Records written
    pub success: usize,
    /// Records rejected by validation or extraction
    pub errors: usize,
}

/// Statistics from ingesting one file
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    /// Records written
    pub success: usize,
    /// Records that failed validation, extraction or whose batch failed
    pub errors: usize,
    /// Batches attempted
    pub batches: usize,
    /// Batches whose transaction was rolled back
    pub failed_batches: usize,
    /// Records handed to the engine
    pub records_read: usize,
    /// Lines the reader skipped as malformed
    pub malformed_lines: usize,
    /// Duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    fn absorb(&mut self, outcome: BatchOutcome) {
        self.success += outcome.success;
        self.errors += outcome.errors;
    }

    /// True when every record was written
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.failed_batches == 0
    }

    /// Get records per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.success as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

/// Drives validation, extraction and upserts for one entity kind and date
pub struct BatchEngine<'a> {
    processor: &'a dyn EntityProcessor,
    date: SnapshotDate,
    batch_size: usize,
    show_progress: bool,
}

impl<'a> BatchEngine<'a> {
    pub fn new(processor: &'a dyn EntityProcessor, date: SnapshotDate, batch_size: usize) -> Self {
        Self {
            processor,
            date,
            batch_size: batch_size.max(1),
            show_progress: false,
        }
    }

    /// Enable or disable the progress bar in [`BatchEngine::process_file`]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Validate and extract a batch without touching the store
    ///
    /// Rows that share a partition key collapse into one: the last extracted
    /// value wins, kept at the position of the first occurrence.
    pub fn prepare_rows(&self, records: &[RawRecord]) -> (Vec<ExtractedRow>, usize) {
        let mut rows: Vec<ExtractedRow> = Vec::with_capacity(records.len());
        let mut positions: HashMap<(i64, SnapshotDate), usize> = HashMap::new();
        let mut errors = 0;

        for record in records {
            if !self.processor.validate(record) {
                debug!(kind = %self.processor.kind(), id = %fields::display_id(record), "Record failed validation");
                errors += 1;
                continue;
            }
            match self.processor.extract(record, self.date) {
                Ok(row) => match positions.get(&row.partition_key()) {
                    Some(&index) => rows[index] = row,
                    None => {
                        positions.insert(row.partition_key(), rows.len());
                        rows.push(row);
                    }
                },
                Err(e) => {
                    warn!(kind = %self.processor.kind(), id = %fields::display_id(record), error = %e, "Record extraction failed");
                    errors += 1;
                }
            }
        }

        (rows, errors)
    }

    /// Validate, extract and upsert one batch in a single transaction
    ///
    /// Per-record failures are counted in the outcome. A store failure rolls
    /// the transaction back and is returned.
    pub fn process_batch(
        &self,
        store: &mut dyn Store,
        records: &[RawRecord],
    ) -> Result<BatchOutcome, IngestError> {
        let (rows, errors) = self.prepare_rows(records);
        let valid = records.len() - errors;

        if !rows.is_empty() {
            store.upsert_rows(&self.processor.upsert_statement(), &rows)?;
        }

        Ok(BatchOutcome {
            success: valid,
            errors,
        })
    }

    /// Consume a record stream in batches
    pub fn process_records<I>(&self, store: &mut dyn Store, records: I) -> IngestStats
    where
        I: IntoIterator<Item = RawRecord>,
    {
        self.run_batches(store, records.into_iter(), &IngestProgress::new("", 0, false))
    }

    fn run_batches<I>(
        &self,
        store: &mut dyn Store,
        mut records: I,
        progress: &IngestProgress,
    ) -> IngestStats
    where
        I: Iterator<Item = RawRecord>,
    {
        let start = Instant::now();
        let mut stats = IngestStats::new();
        let mut batch: Vec<RawRecord> = Vec::with_capacity(self.batch_size);

        loop {
            batch.clear();
            batch.extend(records.by_ref().take(self.batch_size));
            if batch.is_empty() {
                break;
            }

            stats.batches += 1;
            stats.records_read += batch.len();

            match self.process_batch(store, &batch) {
                Ok(outcome) => {
                    debug!(
                        table = self.processor.table(),
                        batch = stats.batches,
                        success = outcome.success,
                        errors = outcome.errors,
                        "Batch processed"
                    );
                    stats.absorb(outcome);
                }
                Err(e) => {
                    error!(
                        table = self.processor.table(),
                        batch = stats.batches,
                        records = batch.len(),
                        error = %e,
                        "Batch failed, rolled back"
                    );
                    stats.failed_batches += 1;
                    stats.errors += batch.len();
                }
            }

            progress.advance(batch.len() as u64);
            progress.update_counts(stats.success, stats.errors);
        }

        stats.duration = start.elapsed();
        stats
    }

    /// Stream a JSONL file through the engine
    pub fn process_file(
        &self,
        store: &mut dyn Store,
        path: &Path,
        limit: Option<usize>,
    ) -> Result<IngestStats, IngestError> {
        let mut reader = RecordReader::open(path, limit)?;

        let total = if self.show_progress {
            let lines = count_lines(path)?;
            match limit.filter(|l| *l > 0) {
                Some(limit) => lines.min(limit as u64),
                None => lines,
            }
        } else {
            0
        };
        let progress = IngestProgress::new(self.processor.kind().name(), total, self.show_progress);

        let mut stats = self.run_batches(store, reader.by_ref(), &progress);
        stats.malformed_lines = reader.stats().malformed;

        let summary = format!(
            "{} ok, {} errors in {}",
            stats.success,
            stats.errors,
            stats.duration_string()
        );
        if stats.failed_batches > 0 {
            progress.finish_error(&summary);
        } else {
            progress.finish_success(&summary);
        }

        info!(
            kind = %self.processor.kind(),
            file = %path.display(),
            data_date = %self.date,
            success = stats.success,
            errors = stats.errors,
            malformed = stats.malformed_lines,
            failed_batches = stats.failed_batches,
            duration = %stats.duration_string(),
            "File processed"
        );

        Ok(stats)
    }
}
