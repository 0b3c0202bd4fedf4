//! Migration discovery.
//!
//! Migrations are `*.sql` and `*.tpql` files named
//! `<timestamp>-<description>[-[dialect]].<ext>`, applied in file name order,
//! plus [`CodeMigration`]s registered in code.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quarry::{Database, Dialect};
use quarry_core::locator::{PLAIN_EXTENSION, TEMPLATE_EXTENSION};
use quarry_core::{ResolvedPaths, ScriptKind, DEFAULT_NAMESPACE};
use regex::Regex;

use crate::error::{MigrateError, Result};

static DIALECT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[a-z]{3,8}\]").unwrap_or_else(|e| panic!("{e}")));

/// A migration written in Rust.
///
/// It is recorded under [`CodeMigration::name`] and ordered by that name
/// together with the migration files of its namespace.
pub trait CodeMigration {
    /// The name recorded in the migrations table.
    fn name(&self) -> &str;

    /// Applies the migration.
    ///
    /// # Errors
    ///
    /// Any error stops the run.
    fn run(&self, db: &mut Database) -> quarry::Result<()>;
}

/// A migration file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// The file name, which is also the recorded name.
    pub name: String,
    /// Plain SQL or template.
    pub kind: ScriptKind,
    /// Absolute path of the file.
    pub path: PathBuf,
}

/// Collects the migration files of `dirs`, sorted by file name.
///
/// # Errors
///
/// Returns `Io` if a directory cannot be listed.
pub fn discover(dirs: &[PathBuf]) -> Result<Vec<MigrationFile>> {
    let mut files = Vec::new();
    for dir in dirs {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(file) = migration_file(path) {
                files.push(file);
            }
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn migration_file(path: PathBuf) -> Option<MigrationFile> {
    let kind = match path.extension()?.to_str()? {
        PLAIN_EXTENSION => ScriptKind::Plain,
        TEMPLATE_EXTENSION => ScriptKind::Template,
        _ => return None,
    };
    let name = path.file_name()?.to_str()?.to_string();
    Some(MigrationFile { name, kind, path })
}

/// Returns whether a migration named `name` applies to `dialect`.
///
/// Names without a `[tag]` apply everywhere; tagged names only apply to the
/// dialect they name.
#[must_use]
pub fn applies_to(name: &str, dialect: Dialect) -> bool {
    !DIALECT_TAG.is_match(name) || name.contains(&format!("[{}]", dialect.as_str()))
}

/// Returns the directories of the selected namespace.
///
/// `None` selects the `default` namespace.
///
/// # Errors
///
/// Returns `NoMigrationDirectories` if nothing is configured and
/// `NamespaceNotFound` for an unknown namespace.
pub fn namespace_dirs<'a>(
    paths: &'a ResolvedPaths,
    namespace: Option<&str>,
) -> Result<&'a [PathBuf]> {
    if paths.is_empty() {
        return Err(MigrateError::NoMigrationDirectories);
    }
    let (name, implicit) = namespace.map_or((DEFAULT_NAMESPACE, true), |name| (name, false));
    paths
        .namespace(name)
        .ok_or_else(|| MigrateError::NamespaceNotFound {
            namespace: name.to_string(),
            implicit,
        })
}

/// Returns whether `path` lies inside a `vendor` directory.
pub(crate) fn is_vendored(path: &Path) -> bool {
    path.to_string_lossy().contains("/vendor")
}
