//! Tests for explicit transactions on a file database.

mod common;
use common::*;

use quarry::{Args, Connection, Database};

fn file_db(dir: &std::path::Path) -> Database {
    let dsn = format!("sqlite:{}?mode=rwc", dir.join("app.db").display());
    let conn = Connection::new(dsn, dir).unwrap();
    Database::connect(&conn).unwrap()
}

#[test]
fn rollback_discards_changes() {
    let dir = tree(&[]);
    let mut db = file_db(dir.path());
    seed_users(&mut db);

    db.begin().unwrap();
    assert!(db.in_transaction());
    db.execute("DELETE FROM users", Args::none()).run().unwrap();
    assert_eq!(count(&mut db, "users"), 0);
    db.rollback().unwrap();

    assert!(!db.in_transaction());
    assert_eq!(count(&mut db, "users"), 3);
}

#[test]
fn commit_persists_across_connections() {
    let dir = tree(&[]);
    let mut db = file_db(dir.path());
    seed_users(&mut db);

    db.begin().unwrap();
    db.execute("INSERT INTO users (id, name) VALUES (?, ?)", Args::positional([
        quarry::Value::from(4),
        quarry::Value::from("dan"),
    ]))
    .run()
    .unwrap();
    db.commit().unwrap();
    db.close().unwrap();

    let mut db = file_db(dir.path());
    assert_eq!(count(&mut db, "users"), 4);
}

#[test]
fn transactions_do_not_nest() {
    let dir = tree(&[]);
    let mut db = file_db(dir.path());

    db.begin().unwrap();
    assert!(db.begin().is_err());
    db.commit().unwrap();
    assert!(db.commit().is_err());
}
