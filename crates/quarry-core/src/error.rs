//! Error types for script resolution, templating and parameter handling.

use std::path::PathBuf;

use crate::template::TemplateError;

/// Errors raised before a statement ever reaches a database driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configured directory does not exist.
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The dialect or driver identifier is not one of the supported set.
    #[error("Database driver not supported: '{0}'")]
    UnsupportedDriver(String),

    /// No search directory contains the requested namespace.
    #[error("The SQL folder does not exist: {0}")]
    FolderNotFound(String),

    /// Neither a plain nor a template script matches.
    #[error("SQL script does not exist: {namespace}/{name}")]
    ScriptNotFound {
        /// The folder searched in.
        namespace: String,
        /// The script name without extension.
        name: String,
    },

    /// The arguments have a shape the target cannot accept.
    #[error("Unsupported argument shape: {0}")]
    UnsupportedArgumentShape(String),

    /// A bind value falls outside the closed set of supported kinds.
    #[error(
        "Unsupported type '{kind}' for parameter {parameter}: only bool, int, string, null and array are supported"
    )]
    UnsupportedParameterType {
        /// Name (`:name`) or position (`#1`) of the offending parameter.
        parameter: String,
        /// The rejected value kind.
        kind: &'static str,
    },

    /// A template failed while rendering.
    #[error("Failed to render template '{}': {source}", path.display())]
    TemplateRender {
        /// Path of the template file.
        path: PathBuf,
        /// The underlying template error.
        #[source]
        source: TemplateError,
    },

    /// A table or column name fails the identifier allow-list.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// IO error while reading scripts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
