//! Typed row values shared by entity processors and store backends

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::Dialect;

/// Columns identifying a stored row across all snapshots
pub const PARTITION_KEY: [&str; 2] = ["id", "data_date"];

/// Calendar date of the snapshot being ingested
///
/// Every row produced while a snapshot is active carries this date as its
/// `data_date`. It is passed explicitly into extraction rather than read from
/// shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotDate(NaiveDate);

impl SnapshotDate {
    /// Wrap a calendar date
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `YYYY-MM-DD` string
    pub fn parse(value: &str) -> Result<Self, chrono::ParseError> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map(Self)
    }

    /// The underlying calendar date
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for SnapshotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for SnapshotDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for SnapshotDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// SQL type of an extracted column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Decimal,
    Json,
    Date,
}

/// A typed, possibly-null value ready for parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(Option<i64>),
    Decimal(Option<f64>),
    /// Canonical JSON text
    Json(Option<String>),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            FieldValue::Integer(None) | FieldValue::Decimal(None) | FieldValue::Json(None)
        )
    }
}

/// Row of a `character_stats` or `person_stats` table
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub id: i64,
    pub comments: i64,
    pub collects: i64,
    pub data_date: SnapshotDate,
}

/// Row of the `subject_stats` table
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRow {
    pub id: i64,
    pub score: Option<f64>,
    pub score_details: Option<String>,
    pub rank: Option<i64>,
    pub favorite: Option<String>,
    pub data_date: SnapshotDate,
}

/// Fixed-order tuple extracted from one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedRow {
    Stats(StatsRow),
    Subject(SubjectRow),
}

impl ExtractedRow {
    pub fn id(&self) -> i64 {
        match self {
            ExtractedRow::Stats(row) => row.id,
            ExtractedRow::Subject(row) => row.id,
        }
    }

    pub fn data_date(&self) -> SnapshotDate {
        match self {
            ExtractedRow::Stats(row) => row.data_date,
            ExtractedRow::Subject(row) => row.data_date,
        }
    }

    /// The `(id, data_date)` pair identifying the stored row
    pub fn partition_key(&self) -> (i64, SnapshotDate) {
        (self.id(), self.data_date())
    }

    /// Values in statement column order
    pub fn values(&self) -> Vec<FieldValue> {
        match self {
            ExtractedRow::Stats(row) => vec![
                FieldValue::Integer(Some(row.id)),
                FieldValue::Integer(Some(row.comments)),
                FieldValue::Integer(Some(row.collects)),
                FieldValue::Date(row.data_date.date()),
            ],
            ExtractedRow::Subject(row) => vec![
                FieldValue::Integer(Some(row.id)),
                FieldValue::Decimal(row.score),
                FieldValue::Json(row.score_details.clone()),
                FieldValue::Integer(row.rank),
                FieldValue::Json(row.favorite.clone()),
                FieldValue::Date(row.data_date.date()),
            ],
        }
    }
}

/// Statement column with its bind type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }
}

/// Insert-or-update statement keyed on `(id, data_date)`
///
/// On conflict every non-key column is overwritten with the incoming value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertStatement {
    table: String,
    columns: Vec<Column>,
}

impl UpsertStatement {
    pub fn new(table: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Render the SQL text for a backend
    ///
    /// PostgreSQL placeholders carry explicit casts so that parameters bind as
    /// `int8`, `float8`, `text` and `date` regardless of the column type.
    pub fn render(&self, dialect: Dialect) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        let placeholders: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| placeholder(dialect, i + 1, column.column_type))
            .collect();
        let updates: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !PARTITION_KEY.contains(&c.name))
            .map(|c| format!("{name} = EXCLUDED.{name}", name = c.name))
            .collect();

        let action = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
            self.table,
            names.join(", "),
            placeholders.join(", "),
            PARTITION_KEY.join(", "),
            action
        )
    }
}

fn placeholder(dialect: Dialect, position: usize, column_type: ColumnType) -> String {
    match dialect {
        Dialect::DuckDb => format!("${position}"),
        Dialect::Postgres => match column_type {
            ColumnType::Integer => format!("${position}::int8"),
            ColumnType::Decimal => format!("${position}::float8"),
            ColumnType::Json => format!("${position}::text::jsonb"),
            ColumnType::Date => format!("${position}::date"),
        },
    }
}
