//! Script lookup along a search path.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};

/// Extension of plain SQL scripts.
pub const PLAIN_EXTENSION: &str = "sql";
/// Extension of template scripts.
pub const TEMPLATE_EXTENSION: &str = "tpql";

/// How a script produces its SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Literal SQL text (`.sql`).
    Plain,
    /// A template rendered at call time (`.tpql`).
    Template,
}

impl ScriptKind {
    /// Returns the file extension of this kind.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Plain => PLAIN_EXTENSION,
            Self::Template => TEMPLATE_EXTENSION,
        }
    }
}

/// A script file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// The folder the script lives in.
    pub namespace: String,
    /// The script name without extension.
    pub name: String,
    /// Plain or template.
    pub kind: ScriptKind,
    /// Absolute path of the file.
    pub path: PathBuf,
}

impl Script {
    /// Reads the script source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn source(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Finds scripts along an ordered list of search directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLocator;

impl ScriptLocator {
    /// Creates a locator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns whether any search directory contains `namespace`.
    #[must_use]
    pub fn has_namespace(&self, search_paths: &[PathBuf], namespace: &str) -> bool {
        search_paths.iter().any(|dir| dir.join(namespace).is_dir())
    }

    /// Checks that some search directory contains `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] otherwise.
    pub fn require_namespace(&self, search_paths: &[PathBuf], namespace: &str) -> Result<()> {
        if self.has_namespace(search_paths, namespace) {
            Ok(())
        } else {
            Err(Error::FolderNotFound(namespace.to_string()))
        }
    }

    /// Locates `<dir>/<namespace>/<name>.sql`, then `<dir>/<namespace>/<name>.tpql`.
    ///
    /// All directories are scanned for a plain script before any template is
    /// considered, so a plain script anywhere on the search path wins over a
    /// template in a higher-priority directory. An empty plain script does
    /// not count and the template lookup takes over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptNotFound`] if neither exists anywhere, and
    /// [`Error::Io`] if a plain script cannot be inspected.
    pub fn locate(&self, search_paths: &[PathBuf], namespace: &str, name: &str) -> Result<Script> {
        for kind in [ScriptKind::Plain, ScriptKind::Template] {
            let Some(path) = find(search_paths, namespace, name, kind) else {
                continue;
            };
            if kind == ScriptKind::Plain && std::fs::metadata(&path)?.len() == 0 {
                debug!(namespace, name, path = %path.display(), "Skipping empty script");
                continue;
            }
            debug!(namespace, name, path = %path.display(), "Located script");
            return Ok(Script {
                namespace: namespace.to_string(),
                name: name.to_string(),
                kind,
                path,
            });
        }
        Err(Error::ScriptNotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

fn find(search_paths: &[PathBuf], namespace: &str, name: &str, kind: ScriptKind) -> Option<PathBuf> {
    let file = format!("{name}.{}", kind.extension());
    search_paths
        .iter()
        .map(|dir| dir.join(namespace).join(&file))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_extension() {
        assert_eq!(ScriptKind::Plain.extension(), "sql");
        assert_eq!(ScriptKind::Template.extension(), "tpql");
    }

    #[test]
    fn test_not_found_on_empty_search_path() {
        let err = ScriptLocator::new().locate(&[], "members", "list").unwrap_err();
        assert!(matches!(
            err,
            Error::ScriptNotFound { ref namespace, ref name } if namespace == "members" && name == "list"
        ));
    }

    #[test]
    fn test_missing_namespace() {
        let err = ScriptLocator::new()
            .require_namespace(&[PathBuf::from("/nowhere")], "members")
            .unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(ref f) if f == "members"));
    }
}
