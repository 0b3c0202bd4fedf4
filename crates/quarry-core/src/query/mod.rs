//! Text-level query handling: masking, placeholder extraction and
//! diagnostic interpolation.
//!
//! Nothing here parses SQL. The only structure recognized is the boundary of
//! string literals, comments and dollar-quoted blocks, which must survive any
//! rewrite byte for byte.

mod mask;
mod placeholder;

pub use mask::MaskedSql;
pub use placeholder::{named_placeholders, rewrite, scan, Occurrence, Placeholder};

use crate::args::Args;
use crate::dialect::Dialect;

/// Renders `sql` with its bound values inlined, for logging and debugging.
///
/// Named arguments replace matching `:name` markers; positional arguments
/// replace `?` markers left to right. Markers without a value, and anything
/// inside a protected span, are left untouched. The output is not guaranteed
/// to be valid SQL.
#[must_use]
pub fn interpolate(sql: &str, args: &Args, dialect: Dialect) -> String {
    let mut positional = 0;
    rewrite(sql, |_, placeholder| match (placeholder, args) {
        (Placeholder::Named(name), Args::Named(map)) => {
            map.get(name).map(|value| value.to_literal(dialect))
        }
        (Placeholder::Positional, Args::Positional(values)) => {
            let value = values.get(positional);
            positional += 1;
            value.map(|value| value.to_literal(dialect))
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_interpolate_named() {
        let args = Args::named([("val", "O'Reilly")]);
        assert_eq!(
            interpolate("SELECT * FROM t WHERE v = :val", &args, Dialect::Sqlite),
            "SELECT * FROM t WHERE v = 'O''Reilly'"
        );
    }

    #[test]
    fn test_interpolate_null_and_array() {
        let args = Args::named([("val", Value::Null)]);
        assert_eq!(
            interpolate("SELECT * FROM t WHERE v = :val", &args, Dialect::Sqlite),
            "SELECT * FROM t WHERE v = NULL"
        );

        let args = Args::named([("val", Value::Json(json!([1, 2, 3])))]);
        assert_eq!(
            interpolate("SELECT * FROM t WHERE v = :val", &args, Dialect::Sqlite),
            "SELECT * FROM t WHERE v = '[1,2,3]'"
        );
    }

    #[test]
    fn test_interpolate_positional() {
        let args = Args::positional([Value::Bool(true), Value::Int(1983)]);
        assert_eq!(
            interpolate("SELECT ? AS flag, '?' AS q WHERE y = ? AND z = ?", &args, Dialect::Pgsql),
            "SELECT true AS flag, '?' AS q WHERE y = 1983 AND z = ?"
        );
    }

    #[test]
    fn test_interpolate_leaves_protected_spans() {
        let args = Args::named([("year", 1983)]);
        let sql = "SELECT 'mantas, -- :year' AS s, :year -- :year\n/* :year */";
        assert_eq!(
            interpolate(sql, &args, Dialect::Sqlite),
            "SELECT 'mantas, -- :year' AS s, 1983 -- :year\n/* :year */"
        );
    }

    #[test]
    fn test_interpolate_unknown_name_is_kept() {
        let args = Args::named([("a", 1)]);
        assert_eq!(
            interpolate("SELECT :a, :b", &args, Dialect::Sqlite),
            "SELECT 1, :b"
        );
    }
}
