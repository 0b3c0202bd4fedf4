#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use quarry::{Args, Connection, DirectoryConfig, Value};
use quarry_migrate::environment::Environment;
use tempfile::TempDir;

/// A temporary project: a SQLite file plus migration directories.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("Failed to create temp dir: {e}"));
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to `rel`, creating parent directories.
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| panic!("Failed to create dir: {e}"));
        }
        fs::write(&path, contents).unwrap_or_else(|e| panic!("Failed to write {rel}: {e}"));
        path
    }

    /// Creates the directory `rel`.
    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(&path).unwrap_or_else(|e| panic!("Failed to create {rel}: {e}"));
        path
    }

    pub fn dsn(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.dir.path().join("app.db").display())
    }

    /// Connection settings with `migrations` as migration directories.
    pub fn connection(&self, migrations: impl Into<DirectoryConfig>) -> Connection {
        Connection::new(self.dsn(), Vec::<PathBuf>::new())
            .and_then(|conn| conn.with_migrations(migrations))
            .unwrap_or_else(|e| panic!("Failed to configure connection: {e}"))
    }

    /// Opens an environment on the project database.
    pub fn env(&self, migrations: impl Into<DirectoryConfig>) -> Environment {
        Environment::open(&self.connection(migrations))
            .unwrap_or_else(|e| panic!("Failed to open environment: {e}"))
    }
}

/// Returns whether `table` exists.
pub fn table_exists(env: &mut Environment, table: &str) -> bool {
    let row = env
        .db_mut()
        .execute(
            "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name = :name",
            Args::named([("name", table)]),
        )
        .one()
        .unwrap_or_else(|e| panic!("Failed to query sqlite_master: {e}"))
        .unwrap_or_else(|| panic!("No row from sqlite_master"));
    matches!(row.get("n"), Some(Value::Int(1)))
}

/// Returns the recorded migration names in order.
pub fn recorded(env: &mut Environment) -> Vec<String> {
    env.applied_migrations()
        .unwrap_or_else(|e| panic!("Failed to read migrations: {e}"))
        .into_iter()
        .collect()
}
