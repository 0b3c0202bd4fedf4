#![allow(dead_code)]

use std::fs;
use std::path::Path;

use quarry::{Args, Connection, Database, Value};
use tempfile::TempDir;

/// Creates a temporary directory holding `files` (relative path, contents).
pub fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap_or_else(|e| panic!("Failed to create temp dir: {e}"));
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| panic!("Failed to create dir: {e}"));
        }
        fs::write(&path, contents).unwrap_or_else(|e| panic!("Failed to write {rel}: {e}"));
    }
    dir
}

/// Opens an in-memory SQLite database searching `sql_dir` for scripts.
pub fn memory_db(sql_dir: &Path) -> Database {
    let conn = Connection::new("sqlite::memory:", sql_dir)
        .unwrap_or_else(|e| panic!("Failed to configure connection: {e}"));
    Database::connect(&conn).unwrap_or_else(|e| panic!("Failed to connect: {e}"))
}

/// Creates and fills `users (id, name)`.
pub fn seed_users(db: &mut Database) {
    db.execute_unprepared(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO users (id, name) VALUES (1, 'ann'), (2, 'bob'), (3, 'cid');",
    )
    .unwrap_or_else(|e| panic!("Failed to seed users: {e}"));
}

/// Returns `SELECT COUNT(*) FROM <table>`.
pub fn count(db: &mut Database, table: &str) -> i64 {
    let row = db
        .execute(format!("SELECT COUNT(*) AS n FROM {table}"), Args::none())
        .one()
        .unwrap_or_else(|e| panic!("Failed to count {table}: {e}"))
        .unwrap_or_else(|| panic!("No count row for {table}"));
    match row.get("n") {
        Some(Value::Int(n)) => *n,
        other => panic!("Unexpected count {other:?}"),
    }
}
