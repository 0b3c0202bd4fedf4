//! Error types for database access.

/// Errors raised while resolving, rendering or executing queries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Script resolution, templating or parameter error.
    #[error(transparent)]
    Core(#[from] quarry_core::Error),

    /// The database reported a failure, or a statement was misused.
    #[error("SQL error{}: {message}", code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    SqlExecution {
        /// Driver-native error message.
        message: String,
        /// SQLSTATE or driver error code, when the driver reports one.
        code: Option<String>,
    },
}

impl Error {
    /// Creates a [`Error::SqlExecution`] without a driver code.
    pub fn sql(message: impl Into<String>) -> Self {
        Self::SqlExecution {
            message: message.into(),
            code: None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) => Self::SqlExecution {
                message: db.message().to_string(),
                code: db.code().map(std::borrow::Cow::into_owned),
            },
            None => Self::sql(err.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Core(quarry_core::Error::Io(err))
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;
