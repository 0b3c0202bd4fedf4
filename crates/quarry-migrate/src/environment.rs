//! The database a migration command works on.

use std::collections::BTreeSet;

use quarry::{Connection, Database, Dialect};

use crate::error::{MigrateError, Result};
use crate::history::MigrationHistory;

/// An open database together with its migration bookkeeping.
pub struct Environment {
    db: Database,
    history: MigrationHistory,
}

impl Environment {
    /// Connects to the database described by `connection`.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the database cannot be reached.
    pub fn open(connection: &Connection) -> Result<Self> {
        Ok(Self::from_database(Database::connect(connection)?))
    }

    /// Wraps an already open database.
    #[must_use]
    pub fn from_database(db: Database) -> Self {
        let history = MigrationHistory::new(db.connection());
        Self { db, history }
    }

    /// Returns the database.
    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    /// Returns the database mutably.
    pub fn db_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        self.db.connection()
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    /// Returns the migration history.
    #[must_use]
    pub const fn history(&self) -> &MigrationHistory {
        &self.history
    }

    /// Checks whether the migrations table exists.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the catalog query fails.
    pub fn has_migrations_table(&mut self) -> Result<bool> {
        self.history.exists(&mut self.db)
    }

    /// Creates the migrations table.
    ///
    /// # Errors
    ///
    /// Returns `MigrationsTableExists` if the table is already there and
    /// `SqlExecution` if the DDL fails.
    pub fn create_migrations_table(&mut self) -> Result<()> {
        if self.has_migrations_table()? {
            return Err(MigrateError::MigrationsTableExists(self.history.table()));
        }
        self.history.create(&mut self.db)
    }

    /// Creates the migrations table unless it exists. Returns whether it
    /// was created.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the catalog query or the DDL fails.
    pub fn ensure_migrations_table(&mut self) -> Result<bool> {
        if self.has_migrations_table()? {
            return Ok(false);
        }
        self.history.create(&mut self.db)?;
        Ok(true)
    }

    /// Returns the names of all applied migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the table cannot be read.
    pub fn applied_migrations(&mut self) -> Result<BTreeSet<String>> {
        self.history.applied(&mut self.db)
    }

    /// Records `name` as applied.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the insert fails.
    pub fn record_migration(&mut self, name: &str) -> Result<()> {
        self.history.record_applied(&mut self.db, name)
    }

    /// Closes the database.
    ///
    /// # Errors
    ///
    /// Returns `SqlExecution` if the driver fails to shut down cleanly.
    pub fn close(self) -> Result<()> {
        Ok(self.db.close()?)
    }
}
