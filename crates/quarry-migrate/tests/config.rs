//! Tests for loading connections from a configuration file.

mod common;
use common::*;

use quarry_migrate::config::DEFAULT_CONFIG_FILE;
use quarry_migrate::prelude::*;

#[test]
fn loads_relative_directories_from_the_config_dir() {
    let project = Project::new();
    project.dir("sql/users");
    project.dir("migrations/sqlite");
    project.dir("migrations/all");
    let path = project.file(
        DEFAULT_CONFIG_FILE,
        r#"
[connections.default]
dsn = "sqlite::memory:"
sql = "sql"
migrations = { sqlite = "migrations/sqlite", all = "migrations/all" }
print = true
"#,
    );

    let config = Config::load(&path).unwrap();
    let conn = config.connection("default").unwrap();
    assert!(conn.print());
    assert_eq!(conn.sql_dirs().len(), 1);
    assert!(conn.sql_dirs()[0].ends_with("sql"));

    let dirs = conn.migration_dirs().flat().unwrap();
    assert_eq!(dirs.len(), 2);
    assert!(dirs[0].ends_with("migrations/sqlite"));
    assert!(dirs[1].ends_with("migrations/all"));
}

#[test]
fn unknown_connection() {
    let project = Project::new();
    let path = project.file(
        DEFAULT_CONFIG_FILE,
        "[connections.default]\ndsn = \"sqlite::memory:\"\n",
    );
    let config = Config::load(&path).unwrap();
    let err = config.connection("reports").unwrap_err();
    assert_eq!(err.to_string(), "Connection 'reports' does not exist");
}

#[test]
fn migrations_from_a_loaded_config() {
    let project = Project::new();
    project.file(
        "migrations/230101-000000-users.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY);",
    );
    let path = project.file(
        DEFAULT_CONFIG_FILE,
        &format!(
            "[connections.default]\ndsn = \"{}\"\nmigrations = \"migrations\"\n",
            project.dsn()
        ),
    );

    let conn = Config::load(&path).unwrap().connection("default").unwrap();
    let mut env = Environment::open(&conn).unwrap();
    let report = Migrator::new().apply(true).run(&mut env).unwrap();
    assert_eq!(report.applied, 1);
    assert!(table_exists(&mut env, "users"));
}
