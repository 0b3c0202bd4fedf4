//! Creates new, timestamped migration files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use quarry::Connection;
use quarry_core::locator::{PLAIN_EXTENSION, TEMPLATE_EXTENSION};
use tracing::info;

use crate::error::{MigrateError, Result};
use crate::migration;

/// Body of a new template migration.
pub const TEMPLATE_SKELETON: &str = "{% if dialect == \"pgsql\" %}\n\n{% else %}\n\n{% endif %}\n";

/// Creates an empty migration named after `name` in the first directory of
/// the selected namespace and returns its path.
///
/// Spaces and underscores in `name` become dashes and the name is
/// lowercased. Without an extension the migration is plain SQL.
///
/// # Errors
///
/// Returns `WrongExtension` for an extension other than `sql` or `tpql`,
/// the namespace selection errors of
/// [`namespace_dirs`](crate::migration::namespace_dirs), `VendorDirectory`
/// or `NotWritable` for an unsuitable directory and `Io` if writing fails.
pub fn add_migration(
    connection: &Connection,
    name: &str,
    namespace: Option<&str>,
) -> Result<PathBuf> {
    let (file_name, extension) = normalize(name)?;
    let dirs = migration::namespace_dirs(connection.migration_dirs(), namespace)?;
    let dir = dirs.first().ok_or(MigrateError::NoMigrationDirectories)?;
    check_target(dir)?;

    let timestamp = Local::now().format("%y%m%d-%H%M%S");
    let path = dir.join(format!("{timestamp}-{file_name}"));
    let contents = if extension == TEMPLATE_EXTENSION {
        TEMPLATE_SKELETON
    } else {
        ""
    };
    fs::write(&path, contents)?;
    info!(path = %path.display(), "Migration created");
    Ok(path)
}

/// Returns the normalized file name and its extension.
fn normalize(name: &str) -> Result<(String, String)> {
    let mut file_name = name.replace([' ', '_'], "-").to_lowercase();
    let extension = Path::new(&file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());
    match extension.as_deref() {
        None => {
            file_name.push('.');
            file_name.push_str(PLAIN_EXTENSION);
            Ok((file_name, PLAIN_EXTENSION.to_string()))
        }
        Some(ext) if ext == PLAIN_EXTENSION || ext == TEMPLATE_EXTENSION => {
            let ext = ext.to_string();
            Ok((file_name, ext))
        }
        Some(ext) => Err(MigrateError::WrongExtension(ext.to_string())),
    }
}

fn check_target(dir: &Path) -> Result<()> {
    if migration::is_vendored(dir) {
        return Err(MigrateError::VendorDirectory(dir.to_path_buf()));
    }
    if fs::metadata(dir)?.permissions().readonly() {
        return Err(MigrateError::NotWritable(dir.to_path_buf()));
    }
    Ok(())
}
