//! Stats and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/health", get(health))
}

/// GET /api/stats: row counts and database size.
async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = state.store.get_stats()?;
    Ok(Json(serde_json::json!({
        "graphs": stats.total_graphs,
        "nodes": stats.total_nodes,
        "edges": stats.total_edges,
        "messages": stats.total_messages,
        "unreadMessages": stats.unread_messages,
        "dbSizeMb": stats.db_size_mb,
    })))
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cefg",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
