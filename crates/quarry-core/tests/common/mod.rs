#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory tree of script folders.
pub struct Tree {
    dir: TempDir,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap_or_else(|e| panic!("Failed to create temp dir: {e}")),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Creates `rel` (and parents) as a directory and returns its canonical path.
    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(&path).unwrap_or_else(|e| panic!("Failed to create {rel}: {e}"));
        fs::canonicalize(&path).unwrap_or_else(|e| panic!("Failed to canonicalize {rel}: {e}"))
    }

    /// Writes `contents` to `rel`, creating parent directories.
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| panic!("Failed to create parent of {rel}: {e}"));
        }
        fs::write(&path, contents).unwrap_or_else(|e| panic!("Failed to write {rel}: {e}"));
        fs::canonicalize(&path).unwrap_or_else(|e| panic!("Failed to canonicalize {rel}: {e}"))
    }
}
