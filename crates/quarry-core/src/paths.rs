//! Directory configuration and search path resolution.
//!
//! A [`DirectoryConfig`] is whatever the user wrote down: a single path, a
//! list, a dialect map (`{"sqlite": ..., "all": ...}`) or a namespace map
//! (`{"default": ..., "tenant": ...}`). [`PathResolver`] turns it into
//! [`ResolvedPaths`], the ordered search path used to find scripts and
//! migrations.
//!
//! Sibling entries of a list are searched last-declared first, so later
//! configuration shadows earlier defaults. Lists nested inside a namespace
//! map keep their declaration order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Key of the dialect map entry that applies to every dialect.
pub const ALL_DIALECTS: &str = "all";

/// User-supplied directory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectoryConfig {
    /// A single directory.
    Path(PathBuf),
    /// Directories and dialect maps.
    List(Vec<DirectoryConfig>),
    /// A dialect map or a namespace map, told apart by its keys.
    Map(BTreeMap<String, DirectoryConfig>),
}

impl DirectoryConfig {
    /// Builds a map configuration from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns whether the configuration names no directory at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Path(path) => path.as_os_str().is_empty(),
            Self::List(entries) => entries.iter().all(Self::is_empty),
            Self::Map(map) => map.values().all(Self::is_empty),
        }
    }

    /// Joins every relative leaf path onto `base`.
    #[must_use]
    pub fn rebase(&self, base: &Path) -> Self {
        match self {
            Self::Path(path) if path.is_relative() && !path.as_os_str().is_empty() => {
                Self::Path(base.join(path))
            }
            Self::Path(path) => Self::Path(path.clone()),
            Self::List(entries) => Self::List(entries.iter().map(|e| e.rebase(base)).collect()),
            Self::Map(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.rebase(base)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for DirectoryConfig {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for DirectoryConfig {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<&Path> for DirectoryConfig {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DirectoryConfig {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&PathBuf> for DirectoryConfig {
    fn from(path: &PathBuf) -> Self {
        Self::Path(path.clone())
    }
}

impl<T: Into<DirectoryConfig>> From<Vec<T>> for DirectoryConfig {
    fn from(entries: Vec<T>) -> Self {
        Self::List(entries.into_iter().map(Into::into).collect())
    }
}

/// A resolved search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPaths {
    /// Directories in search order.
    Flat(Vec<PathBuf>),
    /// Directories in search order, per namespace.
    Namespaced(BTreeMap<String, Vec<PathBuf>>),
}

impl Default for ResolvedPaths {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

impl ResolvedPaths {
    /// Returns whether no directory is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(dirs) => dirs.is_empty(),
            Self::Namespaced(map) => map.is_empty(),
        }
    }

    /// Returns the flat search path, if this is not namespaced.
    #[must_use]
    pub fn flat(&self) -> Option<&[PathBuf]> {
        match self {
            Self::Flat(dirs) => Some(dirs),
            Self::Namespaced(_) => None,
        }
    }

    /// Returns the directories of `namespace`.
    ///
    /// A flat search path is the implicit `default` namespace.
    #[must_use]
    pub fn namespace(&self, namespace: &str) -> Option<&[PathBuf]> {
        match self {
            Self::Flat(dirs) => (namespace == DEFAULT_NAMESPACE).then_some(dirs.as_slice()),
            Self::Namespaced(map) => map.get(namespace).map(Vec::as_slice),
        }
    }

    /// Returns the namespace names.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        match self {
            Self::Flat(_) => vec![DEFAULT_NAMESPACE],
            Self::Namespaced(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resolves directory configurations for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver {
    dialect: Dialect,
}

impl PathResolver {
    /// Creates a resolver for the active dialect.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the active dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Resolves a configuration, detecting namespace maps.
    ///
    /// A top-level map containing neither the active dialect nor `all` as a
    /// key is a namespace map. Empty namespace keys are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathNotFound`] as soon as one leaf path does not
    /// exist; no partial result is produced.
    pub fn resolve(&self, config: &DirectoryConfig) -> Result<ResolvedPaths> {
        let resolved = match config {
            DirectoryConfig::Map(map) if !self.is_dialect_map(map) => {
                let mut namespaces = BTreeMap::new();
                for (namespace, value) in map {
                    if namespace.is_empty() || value.is_empty() {
                        continue;
                    }
                    namespaces.insert(namespace.clone(), self.collect(value)?);
                }
                ResolvedPaths::Namespaced(namespaces)
            }
            _ => ResolvedPaths::Flat(self.resolve_flat(config)?),
        };
        debug!(dialect = %self.dialect, ?resolved, "Resolved directories");
        Ok(resolved)
    }

    /// Resolves a configuration to a flat search path.
    ///
    /// Every map is read as a dialect map; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathNotFound`] if a leaf path does not exist.
    pub fn resolve_flat(&self, config: &DirectoryConfig) -> Result<Vec<PathBuf>> {
        match config {
            DirectoryConfig::Path(path) => Ok(vec![canonicalize(path)?]),
            DirectoryConfig::List(entries) => {
                let mut dirs = Vec::new();
                for entry in entries {
                    let mut group = self.collect(entry)?;
                    group.append(&mut dirs);
                    dirs = group;
                }
                Ok(dirs)
            }
            DirectoryConfig::Map(map) => self.dialect_map(map),
        }
    }

    /// Prepends newly configured directories to a flat search path.
    ///
    /// Namespaced search paths are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathNotFound`] if a leaf path does not exist; the
    /// search path is not modified in that case.
    pub fn add_directories(
        &self,
        paths: &mut ResolvedPaths,
        config: &DirectoryConfig,
    ) -> Result<()> {
        match paths {
            ResolvedPaths::Flat(dirs) => {
                let mut added = self.resolve_flat(config)?;
                added.append(dirs);
                *dirs = added;
                Ok(())
            }
            ResolvedPaths::Namespaced(_) => {
                warn!("Ignoring flat directories added to a namespaced configuration");
                Ok(())
            }
        }
    }

    fn is_dialect_map(&self, map: &BTreeMap<String, DirectoryConfig>) -> bool {
        map.contains_key(self.dialect.as_str()) || map.contains_key(ALL_DIALECTS)
    }

    /// Dialect entries first, then `all`.
    fn dialect_map(&self, map: &BTreeMap<String, DirectoryConfig>) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for key in [self.dialect.as_str(), ALL_DIALECTS] {
            if let Some(value) = map.get(key) {
                dirs.extend(self.collect(value)?);
            }
        }
        Ok(dirs)
    }

    /// Resolves a value keeping declaration order.
    fn collect(&self, config: &DirectoryConfig) -> Result<Vec<PathBuf>> {
        match config {
            DirectoryConfig::Path(path) => Ok(vec![canonicalize(path)?]),
            DirectoryConfig::List(entries) => {
                let mut dirs = Vec::new();
                for entry in entries {
                    dirs.extend(self.collect(entry)?);
                }
                Ok(dirs)
            }
            DirectoryConfig::Map(map) => self.dialect_map(map),
        }
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|_| Error::PathNotFound(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config: DirectoryConfig = serde_json::from_str(
            r#"["/a", {"sqlite": "/b", "all": ["/c", "/d"]}]"#,
        )
        .unwrap();
        assert_eq!(
            config,
            DirectoryConfig::List(vec![
                DirectoryConfig::from("/a"),
                DirectoryConfig::map([
                    ("all", DirectoryConfig::from(vec!["/c", "/d"])),
                    ("sqlite", DirectoryConfig::from("/b")),
                ]),
            ])
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(DirectoryConfig::List(vec![]).is_empty());
        assert!(DirectoryConfig::from("").is_empty());
        assert!(!DirectoryConfig::from(vec!["/a"]).is_empty());
    }

    #[test]
    fn test_rebase() {
        let config = DirectoryConfig::from(vec!["sql", "/abs"]).rebase(Path::new("/base"));
        assert_eq!(
            config,
            DirectoryConfig::from(vec!["/base/sql", "/abs"])
        );
    }

    #[test]
    fn test_missing_path() {
        let resolver = PathResolver::new(Dialect::Sqlite);
        let err = resolver
            .resolve(&DirectoryConfig::from("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn test_flat_namespace_is_default() {
        let paths = ResolvedPaths::Flat(vec![PathBuf::from("/a")]);
        assert_eq!(paths.namespace("default").map(<[PathBuf]>::len), Some(1));
        assert!(paths.namespace("other").is_none());
        assert_eq!(paths.namespaces(), vec!["default"]);
    }
}
