//! Filter routes: graphs by node type and by node count.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cefg_core::MAX_TEXT_LEN;
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::pages;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/filter/", get(filter_by_type))
        .route("/graphs/type/{node_type}/", get(graphs_by_type))
        .route("/filter/by-node-count/", get(filter_by_node_count))
        .route("/graphs/node-count/{count}/", get(graphs_by_node_count))
        .route("/node-types/", get(node_types))
}

#[derive(Deserialize)]
struct TypeFilterParams {
    node_type: Option<String>,
}

#[derive(Deserialize)]
struct CountFilterParams {
    count: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_node_count(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| ApiError::bad_request("count must be a non-negative integer"))
}

// ---------------------------------------------------------------
// By node type
// ---------------------------------------------------------------

/// GET /filter/?node_type=T: JSON list of graphs containing type T.
/// Without a type, the page listing the known node types.
async fn filter_by_type(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TypeFilterParams>,
) -> Response {
    match non_empty(&params.node_type) {
        Some(node_type) => type_filter_json(&state, node_type).into_response(),
        None => match state.store.node_types() {
            Ok(types) => Html(pages::filter_types(&types)).into_response(),
            Err(e) => pages::server_error(e),
        },
    }
}

fn type_filter_json(state: &AppState, node_type: &str) -> ApiResult {
    if node_type.chars().count() > MAX_TEXT_LEN {
        return Err(ApiError::bad_request(format!(
            "node_type exceeds {} characters",
            MAX_TEXT_LEN
        )));
    }
    let graphs = state.store.graphs_with_node_type(node_type)?;
    Ok(Json(serde_json::json!({
        "node_type": node_type,
        "count": graphs.len(),
        "graphs": graphs,
    })))
}

/// GET /graphs/type/{node_type}/: HTML list of graphs containing the type.
async fn graphs_by_type(
    State(state): State<Arc<AppState>>,
    Path(node_type): Path<String>,
) -> Response {
    match state.store.graphs_with_node_type(&node_type) {
        Ok(graphs) => Html(pages::graphs_by_type(&node_type, &graphs)).into_response(),
        Err(e) => pages::server_error(e),
    }
}

/// GET /node-types/: distinct node types, sorted.
async fn node_types(State(state): State<Arc<AppState>>) -> ApiResult {
    let types = state.store.node_types()?;
    Ok(Json(serde_json::json!({
        "count": types.len(),
        "node_types": types,
    })))
}

// ---------------------------------------------------------------
// By node count
// ---------------------------------------------------------------

/// GET /filter/by-node-count/?count=N: JSON list of graphs with exactly N nodes.
/// Without a count, the page listing the node counts present.
async fn filter_by_node_count(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CountFilterParams>,
) -> Response {
    match non_empty(&params.count) {
        Some(raw) => count_filter_json(&state, raw).into_response(),
        None => match state.store.node_counts() {
            Ok(counts) => Html(pages::filter_counts(&counts)).into_response(),
            Err(e) => pages::server_error(e),
        },
    }
}

fn count_filter_json(state: &AppState, raw: &str) -> ApiResult {
    let node_count = parse_node_count(raw)?;
    let graphs = state.store.graphs_with_node_count(node_count)?;
    Ok(Json(serde_json::json!({
        "node_count": node_count,
        "count": graphs.len(),
        "graphs": graphs,
    })))
}

/// GET /graphs/node-count/{count}/: HTML list of graphs with exactly that many nodes.
async fn graphs_by_node_count(
    State(state): State<Arc<AppState>>,
    Path(count): Path<String>,
) -> Response {
    let Ok(node_count) = parse_node_count(&count) else {
        return pages::not_found("No such node count");
    };
    match state.store.graphs_with_node_count(node_count) {
        Ok(graphs) => Html(pages::graphs_by_node_count(node_count, &graphs)).into_response(),
        Err(e) => pages::server_error(e),
    }
}
