//! Validation of table and column names that are spliced into SQL text.

use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap_or_else(|e| panic!("{e}")));

/// A validated, possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// The schema qualifier, if any.
    pub schema: Option<String>,
    /// The bare table name.
    pub name: String,
}

impl TableName {
    /// Validates a table name for `dialect`.
    ///
    /// A `schema.table` form is accepted only when the dialect supports
    /// schemas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] otherwise.
    pub fn parse(name: &str, dialect: Dialect) -> Result<Self> {
        match name.split_once('.') {
            Some((schema, table)) if dialect.supports_schemas() => Ok(Self {
                schema: Some(column(schema)?.to_string()),
                name: column(table)?.to_string(),
            }),
            Some(_) => Err(Error::InvalidIdentifier(name.to_string())),
            None => Ok(Self {
                schema: None,
                name: column(name)?.to_string(),
            }),
        }
    }

    /// Returns the name as written in SQL.
    #[must_use]
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Validates a column (or unqualified table) name.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] unless the name matches
/// `^[a-zA-Z0-9_]+$`.
pub fn column(name: &str) -> Result<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_table() {
        let table = TableName::parse("migrations", Dialect::Sqlite).unwrap();
        assert_eq!(table.qualified(), "migrations");
    }

    #[test]
    fn test_schema_qualified() {
        let table = TableName::parse("audit.migrations", Dialect::Pgsql).unwrap();
        assert_eq!(table.schema.as_deref(), Some("audit"));
        assert_eq!(table.qualified(), "audit.migrations");
        assert!(TableName::parse("audit.migrations", Dialect::Sqlite).is_err());
    }

    #[test]
    fn test_rejects_injection() {
        assert!(column("applied; DROP TABLE x").is_err());
        assert!(TableName::parse("a.b.c", Dialect::Pgsql).is_err());
        assert!(column("").is_err());
    }
}
