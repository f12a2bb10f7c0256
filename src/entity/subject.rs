//! Subject scores, ranks and favorite breakdowns

use serde_json::Value;
use tracing::warn;

use crate::store::Dialect;

use super::fields;
use super::{
    Column, ColumnType, EntityKind, EntityProcessor, ExtractError, ExtractedRow, RawRecord,
    SnapshotDate, SubjectRow, UpsertStatement,
};

/// Keys expected in a subject's `favorite` object
pub const FAVORITE_KEYS: [&str; 5] = ["wish", "done", "doing", "on_hold", "dropped"];

#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectProcessor;

impl SubjectProcessor {
    fn check_score_details(id: &str, details: &serde_json::Map<String, Value>) {
        for key in details.keys() {
            let valid = key.bytes().all(|b| b.is_ascii_digit())
                && matches!(key.parse::<u8>(), Ok(1..=10));
            if !valid {
                warn!(id, key = %key, "Unexpected score_details key");
            }
        }
    }

    fn check_favorite(id: &str, favorite: &serde_json::Map<String, Value>) {
        let unknown: Vec<&str> = favorite
            .keys()
            .map(String::as_str)
            .filter(|key| !FAVORITE_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            warn!(id, unknown = ?unknown, "favorite contains unknown keys");
        }
    }
}

impl EntityProcessor for SubjectProcessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Subject
    }

    fn schema_ddl(&self, dialect: Dialect) -> Vec<String> {
        // DuckDB's JSON type needs the json extension at runtime
        let json_type = match dialect {
            Dialect::DuckDb => "VARCHAR",
            Dialect::Postgres => "JSONB",
        };
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS subject_stats (
                id INTEGER NOT NULL,
                score DECIMAL(3,1),
                score_details {json_type},
                rank INTEGER,
                favorite {json_type},
                data_date DATE NOT NULL,
                PRIMARY KEY (id, data_date)
            )"
        )];

        if dialect == Dialect::Postgres {
            statements.extend([
                "CREATE INDEX IF NOT EXISTS idx_subject_stats_score ON subject_stats (score DESC)"
                    .to_string(),
                "CREATE INDEX IF NOT EXISTS idx_subject_stats_rank ON subject_stats (rank ASC)"
                    .to_string(),
                "CREATE INDEX IF NOT EXISTS idx_subject_stats_score_details ON subject_stats USING GIN (score_details)"
                    .to_string(),
                "CREATE INDEX IF NOT EXISTS idx_subject_stats_favorite ON subject_stats USING GIN (favorite)"
                    .to_string(),
            ]);
        }

        statements
    }

    fn validate(&self, record: &RawRecord) -> bool {
        if !fields::has_identity(record) {
            return false;
        }
        let id = fields::display_id(record);

        match record.get("score_details") {
            None | Some(Value::Null) => {}
            Some(Value::Object(details)) => Self::check_score_details(&id, details),
            Some(_) => return false,
        }

        match record.get("favorite") {
            None | Some(Value::Null) => {}
            Some(Value::Object(favorite)) => Self::check_favorite(&id, favorite),
            Some(_) => return false,
        }

        true
    }

    fn extract(
        &self,
        record: &RawRecord,
        date: SnapshotDate,
    ) -> Result<ExtractedRow, ExtractError> {
        Ok(ExtractedRow::Subject(SubjectRow {
            id: fields::identity(record)?,
            score: fields::optional_decimal(record, "score")?,
            score_details: fields::optional_object(record, "score_details")?,
            rank: fields::optional_integer(record, "rank")?,
            favorite: fields::optional_object(record, "favorite")?,
            data_date: date,
        }))
    }

    fn upsert_statement(&self) -> UpsertStatement {
        UpsertStatement::new(
            self.table(),
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("score", ColumnType::Decimal),
                Column::new("score_details", ColumnType::Json),
                Column::new("rank", ColumnType::Integer),
                Column::new("favorite", ColumnType::Json),
                Column::new("data_date", ColumnType::Date),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_soft_warnings_do_not_reject() {
        let r = record(json!({
            "id": 12,
            "score_details": {"1": 3, "11": 2, "x": 1},
            "favorite": {"wish": 1, "extra": 2}
        }));
        assert!(SubjectProcessor.validate(&r));
    }

    #[test]
    fn test_non_object_blobs_rejected() {
        assert!(!SubjectProcessor.validate(&record(json!({"id": 1, "favorite": "lots"}))));
        assert!(!SubjectProcessor.validate(&record(json!({"id": 1, "score_details": [1, 2]}))));
        assert!(SubjectProcessor.validate(&record(json!({"id": 1, "favorite": null}))));
    }

    #[test]
    fn test_extract_keeps_unknown_favorite_keys() {
        let date = SnapshotDate::parse("2024-03-01").unwrap();
        let r = record(json!({
            "id": 9,
            "score": 7.3,
            "rank": "120",
            "favorite": {"wish": 1, "extra": 2}
        }));
        let row = SubjectProcessor.extract(&r, date).unwrap();
        assert_eq!(
            row,
            ExtractedRow::Subject(SubjectRow {
                id: 9,
                score: Some(7.3),
                score_details: None,
                rank: Some(120),
                favorite: Some(r#"{"extra":2,"wish":1}"#.to_string()),
                data_date: date,
            })
        );
    }

    #[test]
    fn test_bad_score_is_extraction_error() {
        let date = SnapshotDate::parse("2024-03-01").unwrap();
        let r = record(json!({"id": 9, "score": "high"}));
        assert!(SubjectProcessor.validate(&r));
        assert_eq!(SubjectProcessor.extract(&r, date).unwrap_err().field(), "score");
    }

    #[test]
    fn test_postgres_schema_uses_jsonb_and_gin() {
        let ddl = SubjectProcessor.schema_ddl(Dialect::Postgres);
        assert!(ddl[0].contains("score_details JSONB"));
        assert!(ddl.iter().any(|s| s.contains("USING GIN (favorite)")));
        assert_eq!(SubjectProcessor.schema_ddl(Dialect::DuckDb).len(), 1);
    }

    #[test]
    fn test_duckdb_schema_stores_documents_as_text() {
        let ddl = SubjectProcessor.schema_ddl(Dialect::DuckDb);
        assert!(ddl[0].contains("score_details VARCHAR"));
        assert!(ddl[0].contains("favorite VARCHAR"));
        assert!(!ddl[0].contains("JSON"));
    }
}
