//! Migration history tracking.
//!
//! This module manages the migrations table: one row per applied migration,
//! keyed by its file name.

use std::collections::BTreeSet;

use quarry::{Args, Connection, Database, Dialect, Value};
use quarry_core::TableName;
use tracing::{debug, info};

use crate::error::Result;

/// Schema assumed for an unqualified pgsql table.
const DEFAULT_PG_SCHEMA: &str = "public";

/// Bookkeeping on the configured migrations table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationHistory {
    dialect: Dialect,
    table: TableName,
    migration_column: String,
    applied_column: String,
}

impl MigrationHistory {
    /// Creates a history for the table and columns configured on
    /// `connection`.
    #[must_use]
    pub fn new(connection: &Connection) -> Self {
        Self {
            dialect: connection.dialect(),
            table: connection.migrations_table().clone(),
            migration_column: connection.migration_column().to_string(),
            applied_column: connection.applied_column().to_string(),
        }
    }

    /// Returns the table name as written in SQL.
    #[must_use]
    pub fn table(&self) -> String {
        self.table.qualified()
    }

    /// Returns the DDL creating the table for the dialect.
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let m = &self.migration_column;
        let a = &self.applied_column;
        match self.dialect {
            Dialect::Sqlite => format!(
                "CREATE TABLE {table} (
    {m} text NOT NULL,
    {a} text DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY ({m}),
    CHECK(typeof(\"{m}\") = 'text' AND length(\"{m}\") <= 256),
    CHECK(typeof(\"{a}\") = 'text' AND length(\"{a}\") = 19)
);",
                table = self.table.name,
            ),
            Dialect::Pgsql => format!(
                "CREATE TABLE {schema}.{table} (
    {m} text NOT NULL CHECK (char_length({m}) <= 256),
    {a} timestamp with time zone DEFAULT now() NOT NULL,
    CONSTRAINT pk_{table} PRIMARY KEY ({m})
);",
                schema = self.pg_schema(),
                table = self.table.name,
            ),
            Dialect::Mysql => format!(
                "CREATE TABLE {table} (
    {m} varchar(256) NOT NULL,
    {a} timestamp DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY ({m})
);",
                table = self.table.name,
            ),
        }
    }

    /// Checks whether the table exists.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the catalog query fails.
    pub fn exists(&self, db: &mut Database) -> Result<bool> {
        let (sql, args) = match self.dialect {
            Dialect::Sqlite => (
                "SELECT count(*) AS available FROM sqlite_master \
                 WHERE type = 'table' AND name = :table",
                Args::named([("table", self.table.name.as_str())]),
            ),
            Dialect::Pgsql => (
                "SELECT count(*) AS available FROM pg_tables \
                 WHERE schemaname = :schema AND tablename = :table",
                Args::named([
                    ("schema", self.pg_schema()),
                    ("table", self.table.name.as_str()),
                ]),
            ),
            Dialect::Mysql => (
                "SELECT count(*) AS available FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = :table",
                Args::named([("table", self.table.name.as_str())]),
            ),
        };
        let row = db.execute(sql, args).one()?;
        let available = row.as_ref().and_then(|row| row.get("available"));
        Ok(matches!(available, Some(Value::Int(n)) if *n > 0))
    }

    /// Creates the table.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the DDL fails.
    pub fn create(&self, db: &mut Database) -> Result<()> {
        let sql = self.create_table_sql();
        debug!(sql = %sql, "Creating migrations table");
        db.execute_unprepared(&sql)?;
        info!(table = %self.table(), "Migrations table created");
        Ok(())
    }

    /// Returns the names of all applied migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the table cannot be read.
    pub fn applied(&self, db: &mut Database) -> Result<BTreeSet<String>> {
        let sql = format!("SELECT {} FROM {}", self.migration_column, self.table());
        let rows = db.execute(sql, Args::none()).all()?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_values().into_iter().next() {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Records a migration as applied.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the insert fails.
    pub fn record_applied(&self, db: &mut Database, name: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (:migration)",
            self.table(),
            self.migration_column
        );
        db.execute(sql, Args::named([("migration", name)])).run()?;
        Ok(())
    }

    fn pg_schema(&self) -> &str {
        self.table.schema.as_deref().unwrap_or(DEFAULT_PG_SCHEMA)
    }
}
