//! Bangumi archive statistics - snapshot ingestion and historical backfill
//!
//! Provides:
//! - Streaming JSONL record reading with per-line failure isolation
//! - Entity processors (character, person, subject) with validation and extraction
//! - Batched, transactional upserts keyed on `(id, data_date)`
//! - A snapshot walker that replays every dated dump in an archive's history
//! - Store backends (DuckDB, PostgreSQL) behind a single `Store` trait

pub mod config;
pub mod entity;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod snapshot;
pub mod store;

pub use config::{AppConfig, ArchiveConfig, Backend, ConfigError, DatabaseConfig};
pub use entity::{
    EntityKind, EntityProcessor, ExtractError, ExtractedRow, FieldValue, RawRecord,
    SnapshotDate, UpsertStatement, processor_for,
};
pub use ingest::{BatchEngine, BatchOutcome, IngestError, IngestStats, RecordReader};
pub use pipeline::{KindOutcome, Pipeline, PipelineReport};
pub use snapshot::{SnapshotCheckpoint, SnapshotSource, SnapshotWalker, WalkError, WalkReport};
pub use store::{Connector, Dialect, Store, StoreError};

#[cfg(feature = "git")]
pub use snapshot::GitArchive;
#[cfg(feature = "duckdb-backend")]
pub use store::DuckDbStore;
#[cfg(feature = "postgres-backend")]
pub use store::PostgresStore;
