//! Test utilities for course trees and database setup.
//!
//! Builds throwaway library folders and progress databases that reuse the
//! authoritative schema initialization.

use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A temporary courses root populated through builder calls.
///
/// Files are created empty; the scanner only looks at names.
pub struct CourseTree {
    /// Temporary directory (kept alive for the lifetime of the tree)
    pub temp: TempDir,
}

impl CourseTree {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("create temp dir"),
        }
    }

    /// Add `<course>/<section>/<file>`.
    pub fn lesson(self, course: &str, section: &str, file: &str) -> Self {
        self.file(&format!("{}/{}/{}", course, section, file))
    }

    /// Add an empty file at a root-relative path, creating parent folders.
    pub fn file(self, rel: &str) -> Self {
        let path = self.temp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, b"").expect("write file");
        self
    }

    /// Add an empty folder at a root-relative path.
    pub fn dir(self, rel: &str) -> Self {
        fs::create_dir_all(self.temp.path().join(rel)).expect("create dir");
        self
    }

    /// Add a symlink at a root-relative path pointing at `target`.
    #[cfg(unix)]
    pub fn symlink(self, rel: &str, target: &str) -> Self {
        std::os::unix::fs::symlink(target, self.temp.path().join(rel)).expect("create symlink");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

impl Default for CourseTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress database backed by a file in a temporary directory.
pub struct TestDb {
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestDb {
    /// Open a fresh database with all migrations applied.
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let conn = Connection::open(temp.path().join("progress.db"))?;
        crate::db::schema::run_migrations(&conn)?;
        Ok(Self { temp, conn })
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.temp.path().join("progress.db")
    }
}
