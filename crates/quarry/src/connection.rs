//! Connection settings.
//!
//! A [`Connection`] is a plain value: it names the database, the resolved SQL
//! search path and the migration settings. Opening it yields a
//! [`Database`](crate::Database).

use std::path::{Path, PathBuf};

use quarry_core::identifier::{self, TableName};
use quarry_core::{Dialect, DirectoryConfig, PathResolver, ResolvedPaths};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default name of the migrations table.
pub const DEFAULT_MIGRATIONS_TABLE: &str = "migrations";
/// Default name of the column holding the migration file name.
pub const DEFAULT_MIGRATION_COLUMN: &str = "migration";
/// Default name of the column holding the application time.
pub const DEFAULT_APPLIED_COLUMN: &str = "applied";

/// Connection settings as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectionConfig {
    /// sqlx connection URL.
    pub dsn: String,
    /// SQL script directories.
    #[serde(default = "empty_dirs")]
    pub sql: DirectoryConfig,
    /// Migration directories.
    #[serde(default)]
    pub migrations: Option<DirectoryConfig>,
    /// Migrations table name.
    #[serde(default)]
    pub table: Option<String>,
    /// Column holding the migration file name.
    #[serde(default)]
    pub column_migration: Option<String>,
    /// Column holding the application time.
    #[serde(default)]
    pub column_applied: Option<String>,
    /// Log every query with its values inlined.
    #[serde(default)]
    pub print: bool,
}

const fn empty_dirs() -> DirectoryConfig {
    DirectoryConfig::List(Vec::new())
}

/// Settings of one database connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    dsn: String,
    dialect: Dialect,
    sql_dirs: Vec<PathBuf>,
    migration_dirs: ResolvedPaths,
    migrations_table: TableName,
    migration_column: String,
    applied_column: String,
    print: bool,
}

impl Connection {
    /// Creates connection settings.
    ///
    /// The dialect is taken from the DSN scheme and `sql_dirs` is resolved
    /// for it immediately.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDriver` for an unknown scheme and `PathNotFound`
    /// for a missing directory.
    pub fn new(dsn: impl Into<String>, sql_dirs: impl Into<DirectoryConfig>) -> Result<Self> {
        let dsn = dsn.into();
        let dialect = Dialect::from_dsn(&dsn)?;
        let sql_dirs = PathResolver::new(dialect).resolve_flat(&sql_dirs.into())?;
        Ok(Self {
            dsn,
            dialect,
            sql_dirs,
            migration_dirs: ResolvedPaths::default(),
            migrations_table: TableName::parse(DEFAULT_MIGRATIONS_TABLE, dialect)?,
            migration_column: DEFAULT_MIGRATION_COLUMN.to_string(),
            applied_column: DEFAULT_APPLIED_COLUMN.to_string(),
            print: false,
        })
    }

    /// Builds connection settings from configuration. Relative directories
    /// are taken relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Connection::new`] and of the `with_*`
    /// builders.
    pub fn from_config(config: &ConnectionConfig, base: &Path) -> Result<Self> {
        let mut conn = Self::new(config.dsn.clone(), config.sql.rebase(base))?.with_print(config.print);
        if let Some(migrations) = &config.migrations {
            conn = conn.with_migrations(migrations.rebase(base))?;
        }
        if let Some(table) = &config.table {
            conn = conn.with_migrations_table(table)?;
        }
        if config.column_migration.is_some() || config.column_applied.is_some() {
            let migration = config
                .column_migration
                .as_deref()
                .unwrap_or(DEFAULT_MIGRATION_COLUMN);
            let applied = config
                .column_applied
                .as_deref()
                .unwrap_or(DEFAULT_APPLIED_COLUMN);
            conn = conn.with_migration_columns(migration, applied)?;
        }
        Ok(conn)
    }

    /// Sets the migration directories. A namespace map yields one search
    /// path per namespace; anything else forms the `default` namespace.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for a missing directory.
    pub fn with_migrations(mut self, dirs: impl Into<DirectoryConfig>) -> Result<Self> {
        self.migration_dirs = PathResolver::new(self.dialect).resolve(&dirs.into())?;
        Ok(self)
    }

    /// Sets the migrations table. `schema.table` is accepted for pgsql.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` for a name outside `[a-zA-Z0-9_]`.
    pub fn with_migrations_table(mut self, table: &str) -> Result<Self> {
        self.migrations_table = TableName::parse(table, self.dialect)?;
        Ok(self)
    }

    /// Sets the migration name and application time columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` for a name outside `[a-zA-Z0-9_]`.
    pub fn with_migration_columns(mut self, migration: &str, applied: &str) -> Result<Self> {
        self.migration_column = identifier::column(migration)?.to_string();
        self.applied_column = identifier::column(applied)?.to_string();
        Ok(self)
    }

    /// Logs every executed query with its values inlined.
    #[must_use]
    pub const fn with_print(mut self, print: bool) -> Self {
        self.print = print;
        self
    }

    /// Prepends SQL directories; they are searched before the current ones.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for a missing directory, leaving the search
    /// path unchanged.
    pub fn add_sql_dirs(&mut self, dirs: impl Into<DirectoryConfig>) -> Result<()> {
        let mut added = PathResolver::new(self.dialect).resolve_flat(&dirs.into())?;
        added.append(&mut self.sql_dirs);
        self.sql_dirs = added;
        Ok(())
    }

    /// Prepends migration directories. Namespaced settings are left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for a missing directory.
    pub fn add_migration_dirs(&mut self, dirs: impl Into<DirectoryConfig>) -> Result<()> {
        PathResolver::new(self.dialect).add_directories(&mut self.migration_dirs, &dirs.into())?;
        Ok(())
    }

    /// Returns the connection URL.
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Returns the dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the SQL search path.
    #[must_use]
    pub fn sql_dirs(&self) -> &[PathBuf] {
        &self.sql_dirs
    }

    /// Returns the migration search paths.
    #[must_use]
    pub const fn migration_dirs(&self) -> &ResolvedPaths {
        &self.migration_dirs
    }

    /// Returns the migrations table.
    #[must_use]
    pub const fn migrations_table(&self) -> &TableName {
        &self.migrations_table
    }

    /// Returns the migration name column.
    #[must_use]
    pub fn migration_column(&self) -> &str {
        &self.migration_column
    }

    /// Returns the application time column.
    #[must_use]
    pub fn applied_column(&self) -> &str {
        &self.applied_column
    }

    /// Returns whether queries are logged with values inlined.
    #[must_use]
    pub const fn print(&self) -> bool {
        self.print
    }
}
