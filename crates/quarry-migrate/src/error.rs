//! Error types for the migration system.

use std::path::PathBuf;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Query, template or driver failure.
    #[error(transparent)]
    Quarry(#[from] quarry::Error),

    /// The requested connection is not configured.
    #[error("Connection '{0}' does not exist")]
    ConnectionNotFound(String),

    /// The requested migration namespace is not configured.
    #[error("Migration namespace '{namespace}' does not exist{}", hint_text(*.implicit))]
    NamespaceNotFound {
        /// The namespace that was looked up.
        namespace: String,
        /// Whether the namespace was chosen implicitly.
        implicit: bool,
    },

    /// The connection has no migration directories.
    #[error("No migration directories defined in configuration")]
    NoMigrationDirectories,

    /// `create-migrations-table` found an existing table.
    #[error("Migrations table '{0}' already exists")]
    MigrationsTableExists(String),

    /// `add-migration` was given an unsupported extension.
    #[error("Wrong file extension '{0}'. Use 'sql' or 'tpql' instead")]
    WrongExtension(String),

    /// The target directory belongs to a dependency.
    #[error("The migrations directory is inside './vendor': {}", .0.display())]
    VendorDirectory(PathBuf),

    /// The target directory cannot be written to.
    #[error("Migrations directory is not writable: {}", .0.display())]
    NotWritable(PathBuf),

    /// The configuration file could not be parsed.
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Config {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },

    /// IO error (reading configuration, writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quarry_core::Error> for MigrateError {
    fn from(err: quarry_core::Error) -> Self {
        Self::Quarry(err.into())
    }
}

fn hint_text(implicit: bool) -> &'static str {
    if implicit {
        ". Namespaced migrations need either the --namespace option or a namespace named 'default'"
    } else {
        ""
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
