//! Per-snapshot ingestion of every selected entity kind
//!
//! # Example
//!
//! ```rust,ignore
//! use archive_stats::{ArchiveConfig, DuckDbStore, EntityKind, Pipeline, SnapshotDate};
//!
//! let store = DuckDbStore::open("stats.duckdb")?;
//! let archive = ArchiveConfig::at("bangumiArchive");
//! let report = Pipeline::new(&store, &archive)
//!     .with_batch_size(500)
//!     .run(&EntityKind::ALL, SnapshotDate::parse("2024-02-01")?);
//!
//! assert!(report.is_success());
//! ```

mod executor;
mod report;

pub use executor::Pipeline;
pub use report::{KindOutcome, KindReport, PipelineReport};
