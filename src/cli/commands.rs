//! Single-pass and backfill runs

use tracing::{info, warn};

use archive_stats::{
    AppConfig, ConfigError, GitArchive, Pipeline, SnapshotDate, SnapshotWalker,
};

use crate::args::Selection;
use crate::error::CliError;
use crate::output::{format_pipeline_report, format_walk_report};

fn pipeline<'a>(config: &'a AppConfig, selection: &Selection) -> Pipeline<'a> {
    Pipeline::new(&config.database, &config.archive)
        .with_batch_size(config.batch.batch_size)
        .with_limit(selection.limit)
        .with_progress(config.batch.show_progress)
}

/// Snapshot date for a single-pass run
///
/// An explicit `DATA_DATE` wins; otherwise the HEAD commit of the archive
/// must name a dump.
pub fn resolve_data_date(config: &AppConfig) -> Result<SnapshotDate, ConfigError> {
    if let Some(date) = config.data_date {
        return Ok(date);
    }
    let archive =
        GitArchive::open(&config.archive).map_err(|e| ConfigError::MissingDumpDate(e.to_string()))?;
    match archive.head_dump_date() {
        Ok(Some(date)) => Ok(date),
        Ok(None) => Err(ConfigError::MissingDumpDate(
            "HEAD commit message has no dump-YYYY-MM-DD. label".to_string(),
        )),
        Err(e) => Err(ConfigError::MissingDumpDate(e.to_string())),
    }
}

/// Ingest the archive's current files once
///
/// Returns whether every selected kind completed.
pub fn handle_single_pass(config: &AppConfig, selection: &Selection) -> Result<bool, CliError> {
    let date = resolve_data_date(config)?;
    info!(data_date = %date, kinds = ?selection.kinds, "Single-pass run");

    let report = pipeline(config, selection).run(&selection.kinds, date);
    println!("{}", format_pipeline_report(&report));

    if report.is_success() {
        info!("All data processed");
    } else {
        warn!(failed = ?report.failed_kinds(), "Some entity kinds failed");
    }
    Ok(report.is_success())
}

/// Replay every dump from `start` onwards
///
/// Returns whether every checkpoint completed every selected kind.
pub fn handle_backfill(
    config: &AppConfig,
    selection: &Selection,
    start: SnapshotDate,
) -> Result<bool, CliError> {
    info!(start_date = %start, kinds = ?selection.kinds, "Backfill run");

    let archive = GitArchive::open(&config.archive)?;
    let mut walker = SnapshotWalker::new(archive);
    let pipeline = pipeline(config, selection);

    let report = walker.run(Some(start), |date| pipeline.run(&selection.kinds, date))?;
    println!("{}", format_walk_report(&report));

    Ok(report.is_success())
}
