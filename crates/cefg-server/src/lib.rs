//! CEFG server: HTTP routes and HTML pages over the graph store.

pub mod pages;
pub mod routes;
pub mod state;
pub mod validate;

pub use routes::{build_router, ADMIN_TOKEN_HEADER};
pub use state::AppState;
