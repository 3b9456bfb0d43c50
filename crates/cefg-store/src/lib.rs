//! CEFG Store: SQLite persistence for extracted graphs and contact messages.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
