//! Linear SQL migrations for quarry.
//!
//! Migrations are files named `<timestamp>-<description>.sql` (or `.tpql`
//! for templates) kept in one or more directories per namespace. They run in
//! file name order; each applied one is recorded by file name in a
//! migrations table, so every run applies only what is new.
//!
//! - **Config** - Named connections read from `quarry.toml`
//! - **Environment** - An open database plus its migrations table
//! - **Migrator** - Applies pending migrations and reports on each one
//! - **add_migration** - Creates a new timestamped migration file
//!
//! A file whose name carries a dialect tag such as `[pgsql]` only runs on
//! that dialect. On SQLite and PostgreSQL a run is a test run inside a
//! transaction unless it is told to apply.
//!
//! # Example
//!
//! ```no_run
//! use quarry::Connection;
//! use quarry_migrate::prelude::*;
//!
//! let conn = Connection::new("sqlite:app.db?mode=rwc", "sql")?.with_migrations("migrations")?;
//! let mut env = Environment::open(&conn)?;
//! let report = Migrator::new().apply(true).run(&mut env)?;
//! println!("{}", report.summary());
//! # Ok::<(), quarry_migrate::MigrateError>(())
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what would be applied
//! quarry-migrate migrations
//!
//! # Apply pending migrations of a namespace
//! quarry-migrate migrations --namespace audit --apply
//!
//! # Create a new template migration
//! quarry-migrate add-migration -f "add users.tpql"
//! ```

pub mod add;
pub mod config;
pub mod environment;
pub mod error;
pub mod history;
pub mod migration;
pub mod report;
pub mod runner;

pub use error::{MigrateError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::add::add_migration;
    pub use crate::config::Config;
    pub use crate::environment::Environment;
    pub use crate::error::{MigrateError, Result};
    pub use crate::history::MigrationHistory;
    pub use crate::migration::{CodeMigration, MigrationFile};
    pub use crate::report::{Entry, MigrationReport, Outcome, Status};
    pub use crate::runner::Migrator;
}
