//! End-to-end export tests against a real SQLite database file.

#![cfg(feature = "sqlite")]

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use sqlextract_core::{extract, Credentials, ExtractError, ExtractRequest, ProgressObserver};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

async fn seed_database(path: &Path) {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::query("CREATE TABLE payments (id INTEGER PRIMARY KEY, name TEXT, amount REAL)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO payments (id, name, amount) VALUES (1, 'alice', 10.5), (2, NULL, 20.0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool.close().await;
}

fn request_for(db: &Path, output: &Path, query: &str) -> ExtractRequest {
    ExtractRequest::new(
        format!("sqlite://{}", db.display()),
        Credentials::new("", ""),
        query,
        output,
    )
}

#[tokio::test]
async fn test_full_export_matches_reference_output() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    let request = request_for(
        &db,
        &output,
        "SELECT id, name, amount FROM payments ORDER BY id",
    );
    let summary = extract::run(&request).await.unwrap();

    assert_eq!(summary.record_count, 2);
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "id,name,amount\n1,alice,10.5\n2,,20\n");
}

#[tokio::test]
async fn test_limit_exports_only_first_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    let request = request_for(
        &db,
        &output,
        "SELECT id, name, amount FROM payments ORDER BY id",
    )
    .with_limit(1);
    let summary = extract::run(&request).await.unwrap();

    assert_eq!(summary.record_count, 1);
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "id,name,amount\n1,alice,10.5\n");
}

#[tokio::test]
async fn test_rerun_truncates_previous_destination_content() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    std::fs::write(&output, "unrelated content from an earlier tool\n").unwrap();

    let request = request_for(
        &db,
        &output,
        "SELECT id, name, amount FROM payments ORDER BY id",
    );
    extract::run(&request).await.unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "id,name,amount\n1,alice,10.5\n2,,20\n");
    assert!(!content.contains("unrelated"));
}

#[tokio::test]
async fn test_empty_result_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    let request = request_for(
        &db,
        &output,
        "SELECT id, name, amount FROM payments WHERE id > 100",
    );
    let summary = extract::run(&request).await.unwrap();

    assert_eq!(summary.record_count, 0);
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "id,name,amount\n");
}

#[tokio::test]
async fn test_blob_exports_as_base64() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    let request = request_for(&db, &output, "SELECT X'DEADBEEF' AS blob, NULL AS missing");
    let summary = extract::run(&request).await.unwrap();

    assert_eq!(summary.record_count, 1);
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "blob,missing\n3q2+7w==,\n");
}

#[tokio::test]
async fn test_blob_column_in_table_roundtrips_through_decode_chain() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db.display())).unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE attachments (id INTEGER PRIMARY KEY, body BLOB)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO attachments (id, body) VALUES (1, X'00FF'), (2, NULL)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let request = request_for(&db, &output, "SELECT id, body FROM attachments ORDER BY id");
    let summary = extract::run(&request).await.unwrap();

    assert_eq!(summary.record_count, 2);
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "id,body\n1,AP8=\n2,\n");
}

#[tokio::test]
async fn test_invalid_query_is_query_execution_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    let request = request_for(&db, &output, "SELECT nope FROM does_not_exist");
    let result = extract::run(&request).await;

    assert!(matches!(
        result,
        Err(ExtractError::QueryExecution { .. })
    ));
}

struct RecordingObserver {
    counts: Mutex<Vec<u64>>,
}

impl ProgressObserver for RecordingObserver {
    fn rows_exported(&self, count: u64) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.push(count);
        }
    }
}

#[tokio::test]
async fn test_progress_notifications_through_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data.sqlite");
    let output = dir.path().join("out.csv");
    seed_database(&db).await;

    let request = request_for(
        &db,
        &output,
        "SELECT id, name, amount FROM payments ORDER BY id",
    )
    .with_report_interval(1);
    let observer = RecordingObserver {
        counts: Mutex::new(Vec::new()),
    };

    let summary = extract::run_with_observer(&request, &observer)
        .await
        .unwrap();

    assert_eq!(summary.record_count, 2);
    assert_eq!(*observer.counts.lock().unwrap(), vec![1, 2]);
}
