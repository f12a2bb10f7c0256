//! Embedded DuckDB backend

use duckdb::types::Value;
use tracing::debug;

use crate::entity::{ExtractedRow, FieldValue, SnapshotDate, UpsertStatement};

use super::{Connector, Dialect, Store, StoreError, after_rollback, count_sql};

/// DuckDB-backed store
///
/// Opens a file database, or an in-memory one for tests. Clones made through
/// [`Connector::connect`] share the same database.
pub struct DuckDbStore {
    conn: duckdb::Connection,
    path: Option<String>,
}

impl DuckDbStore {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn =
            duckdb::Connection::open(path).map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> Result<Self, StoreError> {
        let conn =
            duckdb::Connection::open_in_memory().map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self { conn, path: None })
    }

    /// Underlying connection, for ad-hoc queries
    pub fn connection(&self) -> &duckdb::Connection {
        &self.conn
    }

    /// Another handle onto the same database
    pub fn try_clone(&self) -> Result<Self, StoreError> {
        Ok(Self {
            conn: self.conn.try_clone()?,
            path: self.path.clone(),
        })
    }
}

fn bind(value: FieldValue) -> Value {
    match value {
        FieldValue::Integer(Some(v)) => Value::BigInt(v),
        FieldValue::Decimal(Some(v)) => Value::Double(v),
        FieldValue::Json(Some(v)) => Value::Text(v),
        // DuckDB casts ISO text to DATE on insert
        FieldValue::Date(date) => Value::Text(date.format("%Y-%m-%d").to_string()),
        FieldValue::Integer(None) | FieldValue::Decimal(None) | FieldValue::Json(None) => {
            Value::Null
        }
    }
}

impl Store for DuckDbStore {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn execute_ddl(&mut self, statements: &[String]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for sql in statements {
            if let Err(e) = tx.execute_batch(sql) {
                return Err(after_rollback(e, tx.rollback()));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_rows(
        &mut self,
        statement: &UpsertStatement,
        rows: &[ExtractedRow],
    ) -> Result<usize, StoreError> {
        let sql = statement.render(Dialect::DuckDb);
        let tx = self.conn.transaction()?;

        let result = (|| -> Result<usize, duckdb::Error> {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(duckdb::params_from_iter(row.values().into_iter().map(bind)))?;
            }
            Ok(rows.len())
        })();

        match result {
            Ok(written) => {
                tx.commit()?;
                debug!(table = statement.table(), rows = written, "Batch committed");
                Ok(written)
            }
            Err(e) => Err(after_rollback(e, tx.rollback())),
        }
    }

    fn count_rows(&mut self, table: &str, date: Option<SnapshotDate>) -> Result<i64, StoreError> {
        let sql = count_sql(table, Dialect::DuckDb, date.is_some());
        let count: i64 = match date {
            Some(date) => self
                .conn
                .query_row(&sql, [date.to_string()], |row| row.get(0))?,
            None => self.conn.query_row(&sql, [], |row| row.get(0))?,
        };
        Ok(count)
    }
}

impl Connector for DuckDbStore {
    fn connect(&self) -> Result<Box<dyn Store>, StoreError> {
        Ok(Box::new(self.try_clone()?))
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("duckdb:{path}"),
            None => "duckdb:memory".to_string(),
        }
    }
}
