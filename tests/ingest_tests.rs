//! End-to-end ingestion into an in-memory DuckDB database

#![cfg(feature = "duckdb-backend")]

use std::fs;
use std::path::Path;

use archive_stats::{
    ArchiveConfig, DuckDbStore, EntityKind, KindOutcome, Pipeline, SnapshotDate, Store,
};
use tempfile::TempDir;

fn date(s: &str) -> SnapshotDate {
    SnapshotDate::parse(s).unwrap()
}

fn write_lines(dir: &Path, name: &str, lines: &[&str]) {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(dir.join(name), content).unwrap();
}

fn archive_with_all_files() -> (TempDir, ArchiveConfig) {
    let dir = TempDir::new().unwrap();
    write_lines(
        dir.path(),
        "character.jsonlines",
        &[
            r#"{"id":1,"comments":10,"collects":20}"#,
            r#"{"id":2,"comments":0,"collects":5}"#,
        ],
    );
    write_lines(
        dir.path(),
        "person.jsonlines",
        &[r#"{"id":5,"comments":"3","collects":null}"#],
    );
    write_lines(
        dir.path(),
        "subject.jsonlines",
        &[
            r#"{"id":100,"score":7.5,"rank":120,"score_details":{"10":3,"9":1},"favorite":{"wish":10,"done":200}}"#,
        ],
    );
    let archive = ArchiveConfig::at(dir.path());
    (dir, archive)
}

fn stats_rows(store: &DuckDbStore, table: &str) -> Vec<(i64, i64, i64, String)> {
    let sql = format!(
        "SELECT id, comments, collects, CAST(data_date AS VARCHAR) FROM {table} ORDER BY data_date, id"
    );
    let mut stmt = store.connection().prepare(&sql).unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_single_pass_loads_every_kind() {
    let (_dir, archive) = archive_with_all_files();
    let store = DuckDbStore::memory().unwrap();

    let report = Pipeline::new(&store, &archive).run(&EntityKind::ALL, date("2024-01-01"));

    assert!(report.is_success());
    assert_eq!(report.total_success(), 4);
    assert_eq!(report.total_errors(), 0);
    assert_eq!(
        stats_rows(&store, "character_stats"),
        vec![
            (1, 10, 20, "2024-01-01".to_string()),
            (2, 0, 5, "2024-01-01".to_string()),
        ]
    );
}

#[test]
fn test_string_and_null_counts_are_coerced() {
    let (_dir, archive) = archive_with_all_files();
    let store = DuckDbStore::memory().unwrap();

    Pipeline::new(&store, &archive).run(&[EntityKind::Person], date("2024-01-01"));

    assert_eq!(
        stats_rows(&store, "person_stats"),
        vec![(5, 3, 0, "2024-01-01".to_string())]
    );
}

#[test]
fn test_rerunning_a_snapshot_is_idempotent() {
    let (_dir, archive) = archive_with_all_files();
    let store = DuckDbStore::memory().unwrap();
    let pipeline = Pipeline::new(&store, &archive);

    pipeline.run(&EntityKind::ALL, date("2024-01-01"));
    let first = stats_rows(&store, "character_stats");
    let report = pipeline.run(&EntityKind::ALL, date("2024-01-01"));

    assert!(report.is_success());
    assert_eq!(stats_rows(&store, "character_stats"), first);
    let mut conn = store.try_clone().unwrap();
    assert_eq!(conn.count_rows("subject_stats", None).unwrap(), 1);
}

#[test]
fn test_snapshots_do_not_touch_each_other() {
    let (dir, archive) = archive_with_all_files();
    let store = DuckDbStore::memory().unwrap();
    let pipeline = Pipeline::new(&store, &archive);

    pipeline.run(&[EntityKind::Character], date("2024-01-01"));
    write_lines(
        dir.path(),
        "character.jsonlines",
        &[r#"{"id":1,"comments":11,"collects":21}"#],
    );
    pipeline.run(&[EntityKind::Character], date("2024-02-01"));

    assert_eq!(
        stats_rows(&store, "character_stats"),
        vec![
            (1, 10, 20, "2024-01-01".to_string()),
            (2, 0, 5, "2024-01-01".to_string()),
            (1, 11, 21, "2024-02-01".to_string()),
        ]
    );
}

#[test]
fn test_later_line_wins_within_a_file() {
    let dir = TempDir::new().unwrap();
    write_lines(
        dir.path(),
        "character.jsonlines",
        &[
            r#"{"id":7,"comments":1,"collects":1}"#,
            r#"{"id":8,"comments":2,"collects":2}"#,
            r#"{"id":7,"comments":9,"collects":9}"#,
        ],
    );
    let archive = ArchiveConfig::at(dir.path());
    let store = DuckDbStore::memory().unwrap();

    let report = Pipeline::new(&store, &archive)
        .with_batch_size(2)
        .run(&[EntityKind::Character], date("2024-01-01"));

    assert!(report.is_success());
    assert_eq!(
        stats_rows(&store, "character_stats"),
        vec![
            (7, 9, 9, "2024-01-01".to_string()),
            (8, 2, 2, "2024-01-01".to_string()),
        ]
    );
}

#[test]
fn test_bad_records_are_counted_not_fatal() {
    let dir = TempDir::new().unwrap();
    write_lines(
        dir.path(),
        "character.jsonlines",
        &[
            r#"{"id":null,"comments":1}"#,
            "not json at all",
            r#"{"comments":4}"#,
            r#"{"id":3,"comments":"many"}"#,
            r#"{"id":4,"comments":2,"collects":1}"#,
        ],
    );
    let archive = ArchiveConfig::at(dir.path());
    let store = DuckDbStore::memory().unwrap();

    let report = Pipeline::new(&store, &archive).run(&[EntityKind::Character], date("2024-01-01"));

    assert!(report.is_success());
    let stats = report.kinds[0].outcome.stats().unwrap();
    assert_eq!(stats.success, 1);
    assert_eq!(stats.errors, 3);
    assert_eq!(stats.malformed_lines, 1);
    assert!(!stats.is_clean());
}

#[test]
fn test_missing_file_fails_only_that_kind() {
    let dir = TempDir::new().unwrap();
    write_lines(
        dir.path(),
        "character.jsonlines",
        &[r#"{"id":1,"comments":1,"collects":1}"#],
    );
    let archive = ArchiveConfig::at(dir.path());
    let store = DuckDbStore::memory().unwrap();

    let report = Pipeline::new(&store, &archive).run(&EntityKind::ALL, date("2024-01-01"));

    assert!(!report.is_success());
    assert_eq!(report.completed_count(), 1);
    assert_eq!(
        report.failed_kinds(),
        vec![EntityKind::Person, EntityKind::Subject]
    );
    assert!(matches!(
        &report.kinds[1].outcome,
        KindOutcome::Failed { error } if error.contains("person.jsonlines")
    ));

    // tables exist even without input
    let mut conn = store.try_clone().unwrap();
    assert_eq!(conn.count_rows("person_stats", None).unwrap(), 0);
}

#[test]
fn test_limit_caps_lines_read() {
    let (_dir, archive) = archive_with_all_files();
    let store = DuckDbStore::memory().unwrap();

    let report = Pipeline::new(&store, &archive)
        .with_limit(Some(1))
        .run(&[EntityKind::Character], date("2024-01-01"));

    assert_eq!(report.total_success(), 1);
    assert_eq!(stats_rows(&store, "character_stats").len(), 1);
}

#[test]
fn test_subject_documents_are_stored_canonically() {
    let dir = TempDir::new().unwrap();
    write_lines(
        dir.path(),
        "subject.jsonlines",
        &[
            r#"{"id":100,"score":7.5,"rank":120,"score_details":{"9":1,"10":3},"favorite":{"wish":10,"done":200,"hoarded":1}}"#,
            r#"{"id":101,"score":null,"rank":null}"#,
        ],
    );
    let archive = ArchiveConfig::at(dir.path());
    let store = DuckDbStore::memory().unwrap();

    let report = Pipeline::new(&store, &archive).run(&[EntityKind::Subject], date("2024-01-01"));
    assert!(report.is_success());
    assert_eq!(report.total_success(), 2);

    let (score, rank, details, favorite): (Option<f64>, Option<i64>, Option<String>, Option<String>) = store
        .connection()
        .query_row(
            "SELECT CAST(score AS DOUBLE), rank, CAST(score_details AS VARCHAR), CAST(favorite AS VARCHAR) \
             FROM subject_stats WHERE id = 100",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(score, Some(7.5));
    assert_eq!(rank, Some(120));
    assert_eq!(details.as_deref(), Some(r#"{"10":3,"9":1}"#));
    let favorite: serde_json::Value = serde_json::from_str(&favorite.unwrap()).unwrap();
    assert_eq!(favorite["hoarded"], 1);

    let empty: (Option<f64>, Option<String>) = store
        .connection()
        .query_row(
            "SELECT CAST(score AS DOUBLE), CAST(favorite AS VARCHAR) FROM subject_stats WHERE id = 101",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(empty, (None, None));
}
