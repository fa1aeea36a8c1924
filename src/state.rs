//! Application state shared by all handlers.

use rusqlite::Connection;
use std::sync::{Arc, MutexGuard};

use crate::config::Settings;
use crate::db::{self, DbLockError, DbPool};
use crate::domain::{Course, Library};
use crate::library::{self, ScanError};

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Progress database connection
    pub db: DbPool,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: DbPool, settings: Settings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
        }
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbLockError> {
        db::try_lock(&self.db)
    }

    /// Fresh scan of the whole courses root.
    pub fn scan_library(&self) -> Result<Library, ScanError> {
        library::scan_library(&self.settings.courses_dir, &self.settings.scan)
    }

    /// Fresh scan of one course folder.
    pub fn scan_course(&self, course_id: &str) -> Result<Option<Course>, ScanError> {
        library::scan_course(&self.settings.courses_dir, course_id, &self.settings.scan)
    }
}
