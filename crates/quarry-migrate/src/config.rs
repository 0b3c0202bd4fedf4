//! The TOML configuration file.
//!
//! ```toml
//! [connections.default]
//! dsn = "sqlite:app.db?mode=rwc"
//! sql = "sql"
//! migrations = ["migrations", { sqlite = "migrations/sqlite" }]
//! ```
//!
//! Relative directories are taken relative to the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quarry::{Connection, ConnectionConfig};
use serde::Deserialize;

use crate::error::{MigrateError, Result};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "quarry.toml";

/// Connection name used when none is given.
pub const DEFAULT_CONNECTION: &str = "default";

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    connections: BTreeMap<String, ConnectionConfig>,
}

/// Named connections read from a configuration file.
#[derive(Debug, Clone)]
pub struct Config {
    config_dir: PathBuf,
    connections: BTreeMap<String, ConnectionConfig>,
}

impl Config {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Config` if it is not
    /// valid.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::parse(&raw, config_dir).map_err(|source| MigrateError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration text whose relative paths start at
    /// `config_dir`.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for invalid text.
    pub fn parse(raw: &str, config_dir: &Path) -> std::result::Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(raw)?;
        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            connections: file.connections,
        })
    }

    /// Returns the configured connection names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Builds the connection named `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionNotFound` for an unknown name and the
    /// configuration errors of [`Connection::from_config`].
    pub fn connection(&self, name: &str) -> Result<Connection> {
        let config = self
            .connections
            .get(name)
            .ok_or_else(|| MigrateError::ConnectionNotFound(name.to_string()))?;
        Ok(Connection::from_config(config, &self.config_dir)?)
    }
}
