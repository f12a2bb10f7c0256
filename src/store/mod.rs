//! Relational store seam
//!
//! The pipeline only ever talks to a [`Store`]: run idempotent DDL, upsert one
//! batch atomically, count rows. Backends decide how values bind.

mod error;

#[cfg(feature = "duckdb-backend")]
mod duckdb_backend;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;

pub use error::StoreError;

#[cfg(feature = "duckdb-backend")]
pub use duckdb_backend::DuckDbStore;
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::PostgresStore;

use std::fmt::Display;

use tracing::warn;

use crate::entity::{ExtractedRow, SnapshotDate, UpsertStatement};

/// SQL flavour spoken by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    DuckDb,
    Postgres,
}

/// An open connection able to hold entity statistics
pub trait Store {
    fn dialect(&self) -> Dialect;

    /// Run schema statements inside one transaction
    fn execute_ddl(&mut self, statements: &[String]) -> Result<(), StoreError>;

    /// Execute `statement` once per row inside one transaction
    ///
    /// Either every row is written or, on the first failure, the transaction
    /// is rolled back and nothing is.
    fn upsert_rows(
        &mut self,
        statement: &UpsertStatement,
        rows: &[ExtractedRow],
    ) -> Result<usize, StoreError>;

    /// Number of rows in `table`, optionally restricted to one snapshot
    fn count_rows(&mut self, table: &str, date: Option<SnapshotDate>) -> Result<i64, StoreError>;
}

/// Opens stores on demand
///
/// Each entity kind run gets its own connection, so a broken connection only
/// fails that kind.
pub trait Connector {
    fn connect(&self) -> Result<Box<dyn Store>, StoreError>;

    /// Target description for log lines (never includes credentials)
    fn describe(&self) -> String;
}

/// Error to report after a failed statement and its rollback
///
/// The statement error always wins; a rollback failure is only logged.
pub(crate) fn after_rollback<E, R>(error: E, rollback: Result<(), R>) -> StoreError
where
    E: Into<StoreError>,
    R: Display,
{
    if let Err(rollback_error) = rollback {
        warn!(error = %rollback_error, "Rollback failed");
    }
    error.into()
}

pub(crate) fn count_sql(table: &str, dialect: Dialect, filtered: bool) -> String {
    if !filtered {
        return format!("SELECT COUNT(*) FROM {table}");
    }
    match dialect {
        Dialect::DuckDb => format!("SELECT COUNT(*) FROM {table} WHERE data_date = CAST($1 AS DATE)"),
        Dialect::Postgres => format!("SELECT COUNT(*) FROM {table} WHERE data_date = $1::text::date"),
    }
}
