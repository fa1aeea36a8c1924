pub mod progress;
pub mod schema;

use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use progress::*;
pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Path understood by SQLite as a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
    /// Log the error at warn level and return the default
    fn log_warn_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }

    fn log_warn_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                T::default()
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
  let conn = if path.as_os_str() == IN_MEMORY {
    Connection::open_in_memory()?
  } else {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      if let Err(e) = std::fs::create_dir_all(parent) {
        tracing::warn!("Could not create database directory {}: {}", parent.display(), e);
      }
    }

    // Create backup before migrations if database exists
    if path.exists() {
      let backup_path = path.with_extension("db.backup");
      if let Err(e) = std::fs::copy(path, &backup_path) {
        tracing::warn!("Could not create database backup: {}", e);
      }
    }

    Connection::open(path)?
  };

  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}
