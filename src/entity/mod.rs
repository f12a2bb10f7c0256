//! Entity kinds and their processors
//!
//! Each archive file holds one kind of entity. A processor owns everything
//! kind-specific: the table it writes, its DDL, how a raw record is validated,
//! and how the typed row is projected out of it.

mod error;
pub mod fields;
mod row;
mod stats;
mod subject;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{Dialect, Store, StoreError};

pub use error::ExtractError;
pub use row::{
    Column, ColumnType, ExtractedRow, FieldValue, PARTITION_KEY, SnapshotDate, StatsRow,
    SubjectRow, UpsertStatement,
};
pub use stats::StatsProcessor;
pub use subject::{FAVORITE_KEYS, SubjectProcessor};

/// One decoded input line
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Kind of archived entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Character,
    Person,
    Subject,
}

impl EntityKind {
    /// Every kind, in processing order
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Character,
        EntityKind::Person,
        EntityKind::Subject,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Person => "person",
            EntityKind::Subject => "subject",
        }
    }

    /// Destination table
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Character => "character_stats",
            EntityKind::Person => "person_stats",
            EntityKind::Subject => "subject_stats",
        }
    }

    /// File name inside the archive directory
    pub fn default_file_name(&self) -> &'static str {
        match self {
            EntityKind::Character => "character.jsonlines",
            EntityKind::Person => "person.jsonlines",
            EntityKind::Subject => "subject.jsonlines",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "character" => Ok(EntityKind::Character),
            "person" => Ok(EntityKind::Person),
            "subject" => Ok(EntityKind::Subject),
            other => Err(format!(
                "Unsupported entity kind '{other}'. Expected one of: character, person, subject"
            )),
        }
    }
}

/// Kind-specific validation, extraction and schema
pub trait EntityProcessor: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn table(&self) -> &'static str {
        self.kind().table()
    }

    /// Idempotent DDL for the given dialect
    ///
    /// Only `CREATE ... IF NOT EXISTS` statements. Existing tables are never
    /// dropped or altered.
    fn schema_ddl(&self, dialect: Dialect) -> Vec<String>;

    /// Create the table and its indexes in one transaction
    fn ensure_schema(&self, store: &mut dyn Store) -> Result<(), StoreError> {
        let statements = self.schema_ddl(store.dialect());
        store.execute_ddl(&statements)?;
        info!(kind = %self.kind(), table = self.table(), "Schema ready");
        Ok(())
    }

    /// Whether the record is acceptable at all
    ///
    /// May log soft warnings for suspicious but tolerated content.
    fn validate(&self, record: &RawRecord) -> bool;

    /// Project a validated record onto the table's columns
    fn extract(&self, record: &RawRecord, date: SnapshotDate)
    -> Result<ExtractedRow, ExtractError>;

    fn upsert_statement(&self) -> UpsertStatement;
}

static CHARACTER: StatsProcessor = StatsProcessor::new(EntityKind::Character);
static PERSON: StatsProcessor = StatsProcessor::new(EntityKind::Person);
static SUBJECT: SubjectProcessor = SubjectProcessor;

/// The processor responsible for a kind
pub fn processor_for(kind: EntityKind) -> &'static dyn EntityProcessor {
    match kind {
        EntityKind::Character => &CHARACTER,
        EntityKind::Person => &PERSON,
        EntityKind::Subject => &SUBJECT,
    }
}
