//! Application configuration.
//!
//! Every value is resolved with priority: `config.toml` > environment
//! (including a `.env` file) > default. The result is an explicit
//! [`Settings`] value handed to the router; nothing reads configuration
//! after startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::library::ScanOptions;

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "config.toml";

/// Default courses root
pub const DEFAULT_COURSES_DIR: &str = "./courses";

/// Default SQLite database file
pub const DEFAULT_DATABASE_PATH: &str = "./course_shelf.db";

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Number of lessons shown under "Continue watching"
pub const RECENT_LESSONS_LIMIT: usize = 5;

// ==================== Config File ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    library: Option<LibraryConfig>,
    database: Option<DatabaseConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Deserialize)]
struct LibraryConfig {
    courses_dir: Option<String>,
    video_extensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    addr: Option<String>,
    port: Option<u16>,
}

// ==================== Settings ====================

#[derive(Debug, Clone)]
pub struct Settings {
    /// Root folder whose subfolders are courses
    pub courses_dir: PathBuf,
    /// SQLite file for progress, or `:memory:`
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub scan: ScanOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            courses_dir: PathBuf::from(DEFAULT_COURSES_DIR),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            bind_addr: format!("{}:{}", SERVER_ADDR, SERVER_PORT),
            scan: ScanOptions::default(),
        }
    }
}

impl Settings {
    /// Load settings from `config.toml`, `.env` and the process environment.
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let contents = std::fs::read_to_string(CONFIG_FILE).ok();
        let settings = Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok());

        tracing::info!("Courses directory: {}", settings.courses_dir.display());
        tracing::info!("Progress database: {}", settings.database_path.display());
        settings
    }

    /// Resolve settings from config file contents and an environment lookup.
    pub fn from_sources<F>(file_contents: Option<&str>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match file_contents.map(toml::from_str::<FileConfig>) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                tracing::warn!("Ignoring invalid {}: {}", CONFIG_FILE, e);
                FileConfig::default()
            }
            None => FileConfig::default(),
        };
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut settings = Settings::default();
        let (library, database, server) = (file.library, file.database, file.server);

        // Priority 1: config.toml, Priority 2: environment
        if let Some(dir) = library
            .as_ref()
            .and_then(|l| l.courses_dir.clone())
            .or_else(|| env("COURSES_DIR"))
        {
            settings.courses_dir = expand_home(&dir, &env);
        }

        if let Some(extensions) = library.and_then(|l| l.video_extensions) {
            settings.scan = ScanOptions::with_extensions(extensions);
        }

        let db_path = database
            .and_then(|d| d.path)
            .or_else(|| env("DATABASE_URL").map(|url| database_path_from_url(&url)))
            .or_else(|| env("DATABASE_PATH"));
        if let Some(path) = db_path {
            settings.database_path = expand_home(&path, &env);
        }

        let addr = server
            .as_ref()
            .and_then(|s| s.addr.clone())
            .unwrap_or_else(|| SERVER_ADDR.to_string());
        let port = server
            .and_then(|s| s.port)
            .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
            .unwrap_or(SERVER_PORT);
        settings.bind_addr = format!("{}:{}", addr, port);

        settings
    }
}

/// Turn a SQLite connection URL into a file path.
///
/// Accepts `sqlite:///relative.db`, `sqlite:////abs/path.db`,
/// `sqlite://file.db`, `sqlite:file.db`, `sqlite::memory:` and bare paths.
pub fn database_path_from_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest == crate::db::IN_MEMORY {
        return rest.to_string();
    }

    // After the authority slashes, one more slash separates the path:
    // three slashes mean relative, four mean absolute.
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    rest.split('?').next().unwrap_or(rest).to_string()
}

fn expand_home<F>(path: &str, env: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    match path.strip_prefix("~/") {
        Some(rest) => match env("HOME") {
            Some(home) => Path::new(&home).join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
