//! Tests for rendering template scripts.

mod common;
use common::Tree;

use quarry_core::{Args, Dialect, Error, ScriptLocator, TemplateEngine, Value};

const SEARCH: &str = "\
SELECT id, name FROM users
WHERE 1 = 1
{% if name is defined %}
  AND name = :name
{% endif %}
{% if dialect == 'pgsql' %}
  AND tags @> :tags::jsonb
{% endif %}
ORDER BY id -- :order is not a parameter
";

fn render(dialect: Dialect, args: &Args) -> quarry_core::Result<quarry_core::Rendered> {
    let tree = Tree::new();
    let dir = tree.dir("sql");
    tree.file("sql/users/search.tpql", SEARCH);
    let script = ScriptLocator::new().locate(&[dir], "users", "search")?;
    TemplateEngine::new(dialect).render(&script, args)
}

#[test]
fn renders_and_narrows_arguments() {
    let args = Args::named([
        ("name", Value::from("ann")),
        ("tags", Value::from(serde_json::json!(["a"]))),
        ("order", Value::from("id")),
    ]);
    let rendered = render(Dialect::Sqlite, &args).unwrap();
    assert_eq!(
        rendered.sql,
        "SELECT id, name FROM users\nWHERE 1 = 1\n  AND name = :name\nORDER BY id -- :order is not a parameter\n"
    );
    assert_eq!(rendered.args, Args::named([("name", "ann")]));
}

#[test]
fn dialect_branch_keeps_its_parameters() {
    let args = Args::named([("tags", Value::from(serde_json::json!(["a"])))]);
    let rendered = render(Dialect::Pgsql, &args).unwrap();
    assert!(rendered.sql.contains("AND tags @> :tags::jsonb"));
    assert!(!rendered.sql.contains(":name"));
    assert_eq!(rendered.args.len(), 1);
}

#[test]
fn positional_arguments_are_rejected() {
    let err = render(Dialect::Sqlite, &Args::positional(["ann"])).unwrap_err();
    assert!(matches!(err, Error::UnsupportedArgumentShape(_)));
}

#[test]
fn render_errors_name_the_file() {
    let tree = Tree::new();
    let dir = tree.dir("sql");
    let path = tree.file("sql/users/broken.tpql", "SELECT {{ missing }}");
    let script = ScriptLocator::new().locate(&[dir], "users", "broken").unwrap();

    let err = TemplateEngine::new(Dialect::Sqlite)
        .render(&script, &Args::none())
        .unwrap_err();
    match &err {
        Error::TemplateRender { path: p, source } => {
            assert_eq!(p, &path);
            assert_eq!(source.message, "'missing' is undefined");
        }
        other => panic!("Expected TemplateRender, got {other:?}"),
    }
    assert!(err.to_string().contains("'missing' is undefined at position 10..17"));
}

#[test]
fn loops_over_named_lists() {
    let tree = Tree::new();
    let dir = tree.dir("sql");
    tree.file(
        "sql/users/in.tpql",
        "SELECT * FROM users WHERE id IN ({% for id in ids %}{{ id }}{% if not loop.last %}, {% endif %}{% endfor %})",
    );
    let script = ScriptLocator::new().locate(&[dir], "users", "in").unwrap();

    let rendered = TemplateEngine::new(Dialect::Mysql)
        .render(&script, &Args::named([("ids", Value::from(serde_json::json!([3, 5])))]))
        .unwrap();
    assert_eq!(rendered.sql, "SELECT * FROM users WHERE id IN (3, 5)");
    assert_eq!(rendered.args, Args::named(Vec::<(String, Value)>::new()));
}

#[test]
fn raw_blocks_keep_braces_literal() {
    use quarry_core::template::{Context, Template};

    let template = Template::parse(
        "{% if dialect == 'pgsql' %}\n\
         {% raw %}\n\
         SELECT '{{1,2},{3,4}}'::int[][] AS grid, '{% not a tag %}' AS note\n\
         {% endraw %}\n\
         {% endif %}\n",
    )
    .unwrap();
    assert_eq!(
        template.render(&Context::new(Dialect::Pgsql)).unwrap(),
        "SELECT '{{1,2},{3,4}}'::int[][] AS grid, '{% not a tag %}' AS note\n"
    );
    assert_eq!(template.render(&Context::new(Dialect::Sqlite)).unwrap(), "");
}
