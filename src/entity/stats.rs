//! Character and person statistics

use crate::store::Dialect;

use super::fields;
use super::{
    Column, ColumnType, EntityKind, EntityProcessor, ExtractError, ExtractedRow, RawRecord,
    SnapshotDate, StatsRow, UpsertStatement,
};

/// Processor for the `comments`/`collects` counters shared by characters and persons
#[derive(Debug, Clone, Copy)]
pub struct StatsProcessor {
    kind: EntityKind,
}

impl StatsProcessor {
    pub const fn new(kind: EntityKind) -> Self {
        Self { kind }
    }
}

impl EntityProcessor for StatsProcessor {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn schema_ddl(&self, dialect: Dialect) -> Vec<String> {
        let table = self.table();
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER NOT NULL,
                comments INTEGER DEFAULT 0,
                collects INTEGER DEFAULT 0,
                data_date DATE NOT NULL,
                PRIMARY KEY (id, data_date)
            )"
        )];

        if dialect == Dialect::Postgres {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_comments ON {table} (comments DESC)"
            ));
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_collects ON {table} (collects DESC)"
            ));
        }

        statements
    }

    fn validate(&self, record: &RawRecord) -> bool {
        fields::has_identity(record)
    }

    fn extract(
        &self,
        record: &RawRecord,
        date: SnapshotDate,
    ) -> Result<ExtractedRow, ExtractError> {
        Ok(ExtractedRow::Stats(StatsRow {
            id: fields::identity(record)?,
            comments: fields::count(record, "comments")?,
            collects: fields::count(record, "collects")?,
            data_date: date,
        }))
    }

    fn upsert_statement(&self) -> UpsertStatement {
        UpsertStatement::new(
            self.table(),
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("comments", ColumnType::Integer),
                Column::new("collects", ColumnType::Integer),
                Column::new("data_date", ColumnType::Date),
            ],
        )
    }
}
