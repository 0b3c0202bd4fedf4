//! Supported database dialects.
//!
//! The dialect decides which per-dialect script directories are searched,
//! which `[tag]` migration files apply, what the template context exposes
//! and how placeholders and literals are written for the backend.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The closed set of database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Pgsql,
    /// MySQL and MariaDB.
    Mysql,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Self; 3] = [Self::Sqlite, Self::Pgsql, Self::Mysql];

    /// Returns the identifier used in directory maps, migration tags and
    /// template contexts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Pgsql => "pgsql",
            Self::Mysql => "mysql",
        }
    }

    /// Detects the dialect from the scheme of a connection string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDriver`] for unknown schemes.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let scheme = dsn.split_once(':').map_or(dsn, |(scheme, _)| scheme);
        scheme.parse()
    }

    /// Returns whether a migration batch can be wrapped in one transaction.
    ///
    /// MySQL commits implicitly on DDL, so its batches are applied eagerly.
    #[must_use]
    pub const fn supports_transactions(self) -> bool {
        matches!(self, Self::Sqlite | Self::Pgsql)
    }

    /// Returns whether table names may carry a `schema.` qualifier.
    #[must_use]
    pub const fn supports_schemas(self) -> bool {
        matches!(self, Self::Pgsql)
    }

    /// Returns the native placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Pgsql => format!("${index}"),
            Self::Sqlite | Self::Mysql => "?".to_string(),
        }
    }

    /// Quotes a string literal the way the backend's own `quote()` does.
    #[must_use]
    pub fn quote_literal(self, text: &str) -> String {
        let escaped = match self {
            Self::Mysql => text.replace('\\', "\\\\").replace('\'', "''"),
            Self::Sqlite | Self::Pgsql => text.replace('\'', "''"),
        };
        format!("'{escaped}'")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Pgsql),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            _ => Err(Error::UnsupportedDriver(s.to_string())),
        }
    }
}
