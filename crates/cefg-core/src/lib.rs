//! CEFG Core: configuration, error types, and request payload validation.

pub mod config;
pub mod error;
pub mod submission;
pub mod text;

pub use config::{CefgConfig, DataPaths};
pub use error::{Error, Result};
pub use submission::{
    ContactSubmission, EdgeSubmission, GraphSubmission, NodeSubmission, TextQuery,
};
pub use text::{normalize_text, MAX_TEXT_LEN};
