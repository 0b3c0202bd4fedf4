//! Tests for creating migration files.

mod common;
use common::*;

use std::fs;

use quarry::DirectoryConfig;
use quarry_migrate::prelude::*;

#[test]
fn creates_timestamped_sql_file() {
    let project = Project::new();
    let dir = project.dir("migrations");
    let conn = project.connection(&dir);

    let path = add_migration(&conn, "Add Users_Table", None).unwrap();
    let dir = fs::canonicalize(&dir).unwrap();
    assert_eq!(path.parent().unwrap(), dir);

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.ends_with("-add-users-table.sql"), "{name}");
    // yyMMdd-HHmmss-
    let (stamp, _) = name.split_at(14);
    assert!(stamp[..6].chars().all(|c| c.is_ascii_digit()), "{stamp}");
    assert_eq!(&stamp[6..7], "-");
    assert!(stamp[7..13].chars().all(|c| c.is_ascii_digit()), "{stamp}");
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn template_files_get_a_skeleton() {
    let project = Project::new();
    let dir = project.dir("migrations");
    let conn = project.connection(&dir);

    let path = add_migration(&conn, "views.tpql", None).unwrap();
    assert!(path.to_string_lossy().ends_with("-views.tpql"));
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("{% if dialect == \"pgsql\" %}"));
    assert!(contents.contains("{% else %}"));
}

#[test]
fn new_migrations_go_to_the_most_recently_added_directory() {
    let project = Project::new();
    let base = project.dir("base");
    let app = project.dir("app");
    let mut conn = project.connection(&base);
    conn.add_migration_dirs(&app).unwrap();

    let path = add_migration(&conn, "first", None).unwrap();
    assert_eq!(path.parent().unwrap(), fs::canonicalize(&app).unwrap());
}

#[test]
fn namespaced_target() {
    let project = Project::new();
    let audit = project.dir("audit");
    let conn = project.connection(DirectoryConfig::map([("audit", audit.as_path())]));

    let err = add_migration(&conn, "log", None).unwrap_err();
    assert!(matches!(err, MigrateError::NamespaceNotFound { .. }));

    let path = add_migration(&conn, "log", Some("audit")).unwrap();
    assert!(path.exists());
}

#[test]
fn rejects_unknown_extensions() {
    let project = Project::new();
    let dir = project.dir("migrations");
    let conn = project.connection(&dir);

    let err = add_migration(&conn, "seed.php", None).unwrap_err();
    assert!(matches!(err, MigrateError::WrongExtension(ref ext) if ext == "php"));
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
}

#[test]
fn rejects_vendor_directories() {
    let project = Project::new();
    let dir = project.dir("vendor/acme/migrations");
    let conn = project.connection(&dir);

    let err = add_migration(&conn, "patch", None).unwrap_err();
    assert!(matches!(err, MigrateError::VendorDirectory(_)));
    assert!(err.to_string().contains("inside './vendor'"));
}
