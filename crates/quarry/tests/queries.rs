//! Tests for executing literal SQL.

mod common;
use common::*;

use quarry::{Args, Error, Value};

#[test]
fn all_returns_every_row() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());
    seed_users(&mut db);

    let rows = db
        .execute("SELECT id, name FROM users WHERE id >= ? ORDER BY id", Args::positional([2]))
        .all()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].columns(), &["id".to_string(), "name".to_string()]);
    assert_eq!(rows[0].values(), &[Value::Int(2), Value::from("bob")]);
}

#[test]
fn one_walks_buffered_rows() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());
    seed_users(&mut db);

    let mut query = db.execute("SELECT name FROM users ORDER BY id", Args::none());
    let mut names = Vec::new();
    while let Some(row) = query.one().unwrap() {
        names.push(row.into_values().remove(0));
    }
    assert_eq!(names, vec![Value::from("ann"), Value::from("bob"), Value::from("cid")]);
    assert!(query.one().unwrap().is_none());

    query.reset();
    assert_eq!(
        query.one().unwrap().and_then(|row| row.get("name").cloned()),
        Some(Value::from("ann"))
    );
}

#[test]
fn lazy_streams_rows_once() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());
    seed_users(&mut db);

    let mut query = db.execute("SELECT id FROM users WHERE name <> :name ORDER BY id", Args::named([("name", "bob")]));
    let ids: Vec<Value> = query
        .lazy()
        .unwrap()
        .map(|row| row.unwrap().into_values().remove(0))
        .collect();
    assert_eq!(ids, vec![Value::Int(1), Value::Int(3)]);

    // A second call executes again.
    assert_eq!(query.lazy().unwrap().count(), 2);
}

#[test]
fn len_reports_affected_rows() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());
    seed_users(&mut db);

    let affected = db
        .execute("UPDATE users SET name = upper(name) WHERE id <> :id", Args::named([("id", 1)]))
        .len()
        .unwrap();
    assert_eq!(affected, 2);
}

#[test]
fn statements_without_markers_may_hold_several_commands() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());

    db.execute(
        "CREATE TABLE tags (name TEXT); INSERT INTO tags VALUES ('a'); INSERT INTO tags VALUES ('b');",
        Args::none(),
    )
    .run()
    .unwrap();
    assert_eq!(count(&mut db, "tags"), 2);
}

#[test]
fn named_placeholder_used_twice() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());
    seed_users(&mut db);

    let rows = db
        .execute("SELECT id FROM users WHERE id = :id OR id = :id + 1 ORDER BY id", Args::named([("id", 1)]))
        .all()
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn null_and_json_values() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());
    db.execute("CREATE TABLE t (a TEXT, b TEXT)", Args::none()).run().unwrap();
    db.execute(
        "INSERT INTO t (a, b) VALUES (?, ?)",
        Args::positional([Value::Null, Value::from(serde_json::json!([1, 2, 3]))]),
    )
    .run()
    .unwrap();

    let row = db.execute("SELECT a, b FROM t", Args::none()).one().unwrap().unwrap();
    assert_eq!(row.get("a"), Some(&Value::Null));
    assert_eq!(row.get("b"), Some(&Value::from("[1,2,3]")));
}

#[test]
fn markers_inside_strings_are_not_bound() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());

    let row = db
        .execute("SELECT ':name' AS a, '?' AS b, :name AS c -- :other", Args::named([("name", "x")]))
        .one()
        .unwrap()
        .unwrap();
    assert_eq!(
        row.values(),
        &[Value::from(":name"), Value::from("?"), Value::from("x")]
    );
}

#[test]
fn float_parameters_are_rejected() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());

    let err = db.execute("SELECT ?", Args::positional([1.5])).all().unwrap_err();
    assert!(matches!(
        err,
        Error::Core(quarry_core::Error::UnsupportedParameterType { kind: "float", .. })
    ));
}

#[test]
fn unused_named_argument_is_an_error() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());

    let err = db
        .execute("SELECT 1", Args::named([("x", 1)]))
        .run()
        .unwrap_err();
    assert!(matches!(err, Error::SqlExecution { .. }));
    assert!(err.to_string().contains(":x"));
}

#[test]
fn driver_errors_carry_message() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());

    match db.execute("SELECT * FROM missing", Args::none()).all() {
        Err(Error::SqlExecution { message, .. }) => assert!(message.contains("no such table")),
        other => panic!("Expected SqlExecution, got {other:?}"),
    }
}

#[test]
fn display_interpolates() {
    let dir = tree(&[]);
    let mut db = memory_db(dir.path());

    let query = db.execute(
        "SELECT * FROM t WHERE v = :val AND w = ':val'",
        Args::named([("val", "O'Reilly")]),
    );
    assert_eq!(
        query.to_string(),
        "SELECT * FROM t WHERE v = 'O''Reilly' AND w = ':val'"
    );
    assert_eq!(query.interpolate(), query.to_string());
}

#[test]
fn quote_doubles_single_quotes() {
    let dir = tree(&[]);
    let db = memory_db(dir.path());
    assert_eq!(db.quote("it's"), "'it''s'");
}
