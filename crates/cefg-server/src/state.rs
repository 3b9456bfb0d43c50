//! Shared application state.

use cefg_core::CefgConfig;
use cefg_store::SqliteStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: CefgConfig,
    pub store: SqliteStore,
}

impl AppState {
    pub fn new(config: CefgConfig, store: SqliteStore) -> Self {
        Self { config, store }
    }
}
