//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to the CEFG data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Database directory (`data/db/`).
    pub db_dir: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db_dir: root.join("db"),
            root,
        };
        std::fs::create_dir_all(&paths.db_dir)?;
        Ok(paths)
    }

    /// Path of the SQLite database file.
    pub fn db_file(&self) -> PathBuf {
        self.db_dir.join(DB_FILE_NAME)
    }
}

/// File name of the SQLite database inside [`DataPaths::db_dir`].
pub const DB_FILE_NAME: &str = "cefg.db";

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CefgConfig {
    /// Interface the HTTP server binds to.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Directory served under `/static` (front-end scripts and styles).
    pub static_dir: PathBuf,
    /// Shared secret for the admin routes. `None` disables them.
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
}

impl CefgConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid PORT value {:?}, using 8000", raw);
                8000
            }),
            Err(_) => 8000,
        };
        let host = std::env::var("CEFG_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let data_paths = DataPaths::new(data_dir)?;
        let static_dir = std::env::var("CEFG_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));
        let admin_token = std::env::var("CEFG_ADMIN_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if admin_token.is_none() {
            tracing::info!("CEFG_ADMIN_TOKEN not set, admin routes are disabled");
        }

        Ok(Self {
            host,
            port,
            data_paths,
            static_dir,
            admin_token,
        })
    }

    /// `host:port` string for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
