use rusqlite::Connection;
use shelter_core::db::migrations::latest_version;
use shelter_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_creates_document_store() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "documents");
}

#[test]
fn reopening_file_database_keeps_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shelter.sqlite3");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO documents (collection, body) VALUES ('animals', '{\"row\":1}');",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn document_bodies_must_be_json_objects() {
    let conn = open_db_in_memory().unwrap();

    for body in ["[1,2]", "not json", "\"text\""] {
        let result = conn.execute(
            "INSERT INTO documents (collection, body) VALUES ('animals', ?1);",
            [body],
        );
        assert!(result.is_err(), "body {body} should be rejected");
    }
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unopenable_path_reports_open_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("shelter.sqlite3");

    let err = open_db(&path).unwrap_err();
    assert_eq!(err.error_code(), "store_open_failed");
    match err {
        DbError::Open { target, .. } => assert!(target.ends_with("shelter.sqlite3")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_migration_names_itself_and_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conflict.sqlite3");

    // A pre-existing `documents` table without a `collection` column breaks
    // the index created by the first migration.
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE documents (payload TEXT);")
        .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::Migration { version, name, .. } => {
            assert_eq!(version, 1);
            assert_eq!(name, "documents");
        }
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
