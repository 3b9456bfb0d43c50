//! Graph save, lookup, detail, and list routes.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use cefg_core::{GraphSubmission, TextQuery};
use tracing::{debug, info};

use super::{method_not_allowed, parse_id, ApiError, ApiResult};
use crate::pages;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/save_graph/", post(save_graph).fallback(method_not_allowed))
        .route(
            "/check_get_graph/",
            post(check_get_graph).fallback(method_not_allowed),
        )
        .route("/graphs/", get(list_graphs))
        .route("/graphs/{id}/", get(graph_detail))
        .route("/graphs/{id}/json/", get(graph_json))
        .route("/nlp-graph/", get(nlp_graph))
        .route("/nlp-graph-static/", get(nlp_graph))
}

/// Destructive graph routes. Mounted behind the admin token check.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/graphs/{id}/", delete(delete_graph))
}

// ---------------------------------------------------------------
// JSON
// ---------------------------------------------------------------

/// POST /save_graph/: store a graph unless its text is already stored.
async fn save_graph(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let submission = GraphSubmission::from_slice(&body)?;
    let outcome = state.store.save_graph(&submission)?;

    if outcome.is_created() {
        info!(
            "Created graph {} ({} chars of text)",
            outcome.graph_id(),
            submission.text.chars().count()
        );
        Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({
                "graph_id": outcome.graph_id(),
                "created": true,
            })),
        ))
    } else {
        debug!("Save matched existing graph {}", outcome.graph_id());
        Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "graph_id": outcome.graph_id() })),
        ))
    }
}

/// POST /check_get_graph/: stored nodes and edges for a text, or `{graph: null}`.
async fn check_get_graph(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let query = TextQuery::from_slice(&body)?;

    match state.store.lookup_graph(&query.text)? {
        Some((graph, data)) => {
            debug!("check_get_graph hit graph {}", graph.id);
            Ok(Json(serde_json::json!({ "graph": data })))
        }
        None => Ok(Json(serde_json::json!({ "graph": null }))),
    }
}

/// GET /graphs/{id}/json/: `{graph: {nodes, edges}}`.
async fn graph_json(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id).ok_or_else(|| ApiError::not_found("Graph not found"))?;
    if state.store.get_graph(id)?.is_none() {
        return Err(ApiError::not_found("Graph not found"));
    }
    let data = state.store.graph_data(id)?;
    Ok(Json(serde_json::json!({ "graph": data })))
}

/// DELETE /graphs/{id}/: remove a graph with its nodes and edges.
async fn delete_graph(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id).ok_or_else(|| ApiError::not_found("Graph not found"))?;
    if !state.store.delete_graph(id)? {
        return Err(ApiError::not_found("Graph not found"));
    }
    Ok(Json(serde_json::json!({
        "deleted": true,
        "graph_id": id,
    })))
}

// ---------------------------------------------------------------
// HTML
// ---------------------------------------------------------------

/// GET /: the first stored graph.
async fn home(State(state): State<Arc<AppState>>) -> Response {
    let first = match state.store.first_graph() {
        Ok(first) => first,
        Err(e) => return pages::server_error(e),
    };
    let page = match first {
        Some(graph) => match state.store.graph_data(graph.id) {
            Ok(data) => pages::home(Some((&graph, &data))),
            Err(e) => return pages::server_error(e),
        },
        None => pages::home(None),
    };
    Html(page).into_response()
}

/// GET /graphs/: all graphs, ordered by id.
async fn list_graphs(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_graphs() {
        Ok(graphs) => Html(pages::graphs_list(&graphs)).into_response(),
        Err(e) => pages::server_error(e),
    }
}

/// GET /graphs/{id}/: detail page with the graph data embedded for the renderer.
async fn graph_detail(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return pages::not_found("Graph not found");
    };
    let graph = match state.store.get_graph(id) {
        Ok(Some(graph)) => graph,
        Ok(None) => return pages::not_found("Graph not found"),
        Err(e) => return pages::server_error(e),
    };
    match state.store.graph_data(id) {
        Ok(data) => Html(pages::graph_detail(&graph, &data)).into_response(),
        Err(e) => pages::server_error(e),
    }
}

/// GET /nlp-graph/: the text-to-graph tool that calls the save and lookup endpoints.
async fn nlp_graph() -> Html<String> {
    Html(pages::nlp_graph())
}
