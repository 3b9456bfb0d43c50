//! HTTP-level tests: drive the router directly (no listener) and check status
//! codes and response shapes the browser tool relies on.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use cefg_core::CefgConfig;
use cefg_server::{build_router, AppState, ADMIN_TOKEN_HEADER};
use cefg_store::SqliteStore;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "test-admin-token";

fn test_app() -> (Router, TempDir) {
    test_app_with_token(Some(ADMIN_TOKEN))
}

fn test_app_with_token(token: Option<&str>) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = CefgConfig::from_env(dir.path()).unwrap();
    config.admin_token = token.map(str::to_string);
    let store = SqliteStore::open(&config.data_paths.db_dir).unwrap();
    let state = Arc::new(AppState::new(config, store));
    (build_router(state), dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    send_with_token(app, method, uri, body, None).await
}

async fn send_admin(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    send_with_token(app, method, uri, body, Some(ADMIN_TOKEN)).await
}

async fn send_with_token(
    app: &Router,
    method: &str,
    uri: &str,
    body: Body,
    token: Option<&str>,
) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        req = req.header(ADMIN_TOKEN_HEADER, token);
    }
    let req = req.body(body).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = send(app, "GET", uri, Body::empty()).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_html(app: &Router, uri: &str) -> (StatusCode, String) {
    let (status, bytes) = send(app, "GET", uri, Body::empty()).await;
    (status, String::from_utf8(bytes).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = send(app, "POST", uri, Body::from(body.to_string())).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn admin_get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = send_admin(app, "GET", uri, Body::empty()).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn admin_post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = send_admin(app, "POST", uri, Body::from(body.to_string())).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn cat_sat() -> Value {
    json!({
        "text": "cat sat",
        "graph": {
            "nodes": [
                {"id": 1, "type": "NOUN", "text": "cat"},
                {"id": 2, "type": "VERB", "text": "sat"}
            ],
            "edges": [{"source": 1, "target": 2}]
        }
    })
}

fn graph_body(text: &str, types: &[&str]) -> Value {
    let nodes: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"id": i, "type": t, "text": format!("w{}", i)}))
        .collect();
    let edges: Vec<Value> = (1..types.len())
        .map(|i| json!({"source": i - 1, "target": i}))
        .collect();
    json!({"text": text, "graph": {"nodes": nodes, "edges": edges}})
}

#[tokio::test]
async fn test_save_twice_returns_same_id() {
    let (app, _dir) = test_app();

    let (status, first) = post_json(&app, "/save_graph/", cat_sat()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["created"], true);
    assert!(first["graph_id"].is_i64());

    let (status, second) = post_json(&app, "/save_graph/", cat_sat()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["graph_id"], first["graph_id"]);
    assert!(second.get("created").is_none());

    let (_, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(stats["graphs"], 1);
    assert_eq!(stats["nodes"], 2);
    assert_eq!(stats["edges"], 1);
}

#[tokio::test]
async fn test_concurrent_saves_share_one_graph() {
    let (app, _dir) = test_app();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (_, body) = post_json(&app, "/save_graph/", cat_sat()).await;
            body["graph_id"].as_i64().unwrap()
        }));
    }
    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap());
    }

    assert!(ids.iter().all(|id| *id == ids[0]));
    let (_, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(stats["graphs"], 1);
}

#[tokio::test]
async fn test_text_is_normalized_before_dedup() {
    let (app, _dir) = test_app();

    let mut body = cat_sat();
    body["text"] = json!("  Cat SAT ");
    let (_, first) = post_json(&app, "/save_graph/", body).await;
    let (_, second) = post_json(&app, "/save_graph/", cat_sat()).await;
    assert_eq!(first["graph_id"], second["graph_id"]);
}

#[tokio::test]
async fn test_check_get_graph() {
    let (app, _dir) = test_app();

    let (status, miss) = post_json(&app, "/check_get_graph/", json!({"text": "cat sat"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(miss["graph"].is_null());

    post_json(&app, "/save_graph/", cat_sat()).await;

    let (status, hit) = post_json(&app, "/check_get_graph/", json!({"text": "cat sat"})).await;
    assert_eq!(status, StatusCode::OK);
    let nodes = hit["graph"]["nodes"].as_array().unwrap();
    let edges = hit["graph"]["edges"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["type"], "NOUN");
    assert_eq!(nodes[0]["text"], "cat");
    assert_eq!(nodes[1]["type"], "VERB");
    assert_eq!(nodes[1]["text"], "sat");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["source"], nodes[0]["id"]);
    assert_eq!(edges[0]["target"], nodes[1]["id"]);
    assert!(edges[0].get("weight").is_none());
}

#[tokio::test]
async fn test_dangling_edge_leaves_no_graph() {
    let (app, _dir) = test_app();

    let mut body = cat_sat();
    body["graph"]["edges"] = json!([{"source": 1, "target": 99}]);
    let (status, resp) = post_json(&app, "/save_graph/", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].as_str().unwrap().contains("unknown node"));

    let (_, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(stats["graphs"], 0);
    assert_eq!(stats["nodes"], 0);
}

#[tokio::test]
async fn test_oversized_text_rejected_everywhere() {
    let (app, _dir) = test_app();
    let long = "a".repeat(5001);

    let mut body = cat_sat();
    body["text"] = json!(long);
    let (status, resp) = post_json(&app, "/save_graph/", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].is_string());

    let (status, _) = post_json(&app, "/check_get_graph/", json!({ "text": long })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_and_incomplete_bodies() {
    let (app, _dir) = test_app();

    let (status, bytes) = send(&app, "POST", "/save_graph/", Body::from("{oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let resp: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(resp["error"], "Invalid JSON");

    let (status, resp) = post_json(&app, "/save_graph/", json!({"graph": {"nodes": [], "edges": []}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "Missing text");

    let (status, resp) = post_json(&app, "/save_graph/", json!({"text": "x", "graph": {"nodes": 1, "edges": []}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].as_str().unwrap().contains("lists"));
}

#[tokio::test]
async fn test_wrong_method_is_405_json() {
    let (app, _dir) = test_app();

    let (status, resp) = get_json(&app, "/save_graph/").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(resp["error"].is_string());

    let (status, _) = get_json(&app, "/check_get_graph/").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_graph_json_and_delete() {
    let (app, _dir) = test_app();

    let (_, saved) = post_json(&app, "/save_graph/", cat_sat()).await;
    let id = saved["graph_id"].as_i64().unwrap();

    let (status, resp) = get_json(&app, &format!("/graphs/{}/json/", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["graph"]["nodes"].as_array().unwrap().len(), 2);

    let (status, resp) = get_json(&app, "/graphs/999/json/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(resp["error"].is_string());

    let (status, bytes) =
        send_admin(&app, "DELETE", &format!("/graphs/{}/", id), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let resp: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(resp["deleted"], true);

    let (status, _) = get_json(&app, &format!("/graphs/{}/json/", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(stats["nodes"], 0);
    assert_eq!(stats["edges"], 0);
}

#[tokio::test]
async fn test_filter_by_node_type() {
    let (app, _dir) = test_app();

    post_json(&app, "/save_graph/", graph_body("one", &["NOUN", "VERB"])).await;
    post_json(&app, "/save_graph/", graph_body("two", &["ADJ", "NOUN", "NOUN"])).await;
    post_json(&app, "/save_graph/", graph_body("three", &["INTJ"])).await;

    let (status, resp) = get_json(&app, "/filter/?node_type=NOUN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["node_type"], "NOUN");
    let graphs = resp["graphs"].as_array().unwrap();
    assert_eq!(resp["count"], 2);
    assert_eq!(graphs.len(), 2);
    assert_eq!(graphs[0]["text"], "one");
    assert_eq!(graphs[1]["node_count"], 3);
    assert_eq!(graphs[1]["edge_count"], 2);

    let (_, resp) = get_json(&app, "/filter/?node_type=PRON").await;
    assert_eq!(resp["count"], 0);

    let (_, types) = get_json(&app, "/node-types/").await;
    assert_eq!(types["node_types"], json!(["ADJ", "INTJ", "NOUN", "VERB"]));

    let (status, page) = get_html(&app, "/graphs/type/NOUN/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Found 2 graph(s)"));

    let (status, page) = get_html(&app, "/filter/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("type-select"));
}

#[tokio::test]
async fn test_filter_by_node_count() {
    let (app, _dir) = test_app();

    post_json(&app, "/save_graph/", graph_body("one", &["NOUN", "VERB"])).await;
    post_json(&app, "/save_graph/", graph_body("two", &["ADJ", "NOUN"])).await;
    post_json(&app, "/save_graph/", graph_body("three", &["INTJ"])).await;

    let (status, resp) = get_json(&app, "/filter/by-node-count/?count=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["node_count"], 2);
    assert_eq!(resp["count"], 2);

    let (status, resp) = get_json(&app, "/filter/by-node-count/?count=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].is_string());

    let (status, page) = get_html(&app, "/graphs/node-count/1/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("three"));

    let (status, page) = get_html(&app, "/filter/by-node-count/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("/graphs/node-count/2/"));
}

#[tokio::test]
async fn test_html_pages() {
    let (app, _dir) = test_app();

    let (status, page) = get_html(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("No graphs have been saved yet."));

    let (_, saved) = post_json(&app, "/save_graph/", cat_sat()).await;
    let id = saved["graph_id"].as_i64().unwrap();

    let (_, page) = get_html(&app, "/").await;
    assert!(page.contains("graph-data"));

    let (status, page) = get_html(&app, "/graphs/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("cat sat"));
    assert!(page.contains(&format!("/graphs/{}/json/", id)));

    let (status, page) = get_html(&app, &format!("/graphs/{}/", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains(&format!("Graph #{}", id)));

    let (status, _) = get_html(&app, "/graphs/999/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contact_messages() {
    let (app, _dir) = test_app();

    let msg = |name: &str| {
        json!({
            "name": name,
            "email": format!("{}@example.com", name),
            "subject": "Hello",
            "message": "Nice tool"
        })
    };

    let (status, first) = post_json(&app, "/contact/", msg("ada")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, second) = post_json(&app, "/contact/", msg("bob")).await;

    let (status, resp) = post_json(&app, "/contact/", json!({"name": "x", "email": "x@y"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "Missing subject");

    let (status, resp) = admin_post_json(
        &app,
        "/admin/messages/mark-read/",
        json!({"ids": [first["id"], second["id"]]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["updated"], 2);
    assert_eq!(resp["message"], "2 message(s) marked as read.");

    let (_, resp) = admin_post_json(&app, "/admin/messages/mark-unread/", json!({"ids": [first["id"]]})).await;
    assert_eq!(resp["message"], "1 message(s) marked as unread.");

    let (status, list) = admin_get_json(&app, "/admin/messages/?is_read=false").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["messages"][0]["name"], "ada");
    assert_eq!(list["page_size"], 25);

    let (_, list) = admin_get_json(&app, "/admin/messages/").await;
    assert_eq!(list["total"], 2);
    assert_eq!(list["messages"][0]["name"], "bob");

    let (status, _) = admin_get_json(&app, "/admin/messages/?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = test_app();
    let (status, resp) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "healthy");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let (app, _dir) = test_app();
    let (_, saved) = post_json(&app, "/save_graph/", cat_sat()).await;
    let id = saved["graph_id"].as_i64().unwrap();
    let detail = format!("/graphs/{}/", id);

    let (status, resp) = get_json(&app, "/admin/messages/").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(resp["error"].is_string());

    let (status, _) = send_with_token(
        &app,
        "GET",
        "/admin/messages/",
        Body::empty(),
        Some("not-the-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/admin/messages/mark-read/",
        Body::from(json!({"ids": [1]}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "DELETE", &detail, Body::empty()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get_json(&app, &format!("/graphs/{}/json/", id)).await;
    assert_eq!(status, StatusCode::OK);

    // Public GET on the same path is unaffected.
    let (status, _) = get_html(&app, &detail).await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = admin_get_json(&app, "/admin/messages/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 0);
    let (status, _) = send_admin(&app, "DELETE", &detail, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_closed_without_configured_token() {
    let (app, _dir) = test_app_with_token(None);

    let (status, resp) = admin_get_json(&app, "/admin/messages/").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(resp["error"].is_string());

    let (status, _) = send_admin(&app, "DELETE", "/graphs/1/", Body::empty()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post_json(
        &app,
        "/contact/",
        json!({"name": "ada", "email": "ada@example.com", "subject": "Hi", "message": "Hello"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_message_page_out_of_range() {
    let (app, _dir) = test_app();

    let (status, resp) = admin_get_json(&app, "/admin/messages/?page=18446744073709551615").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].is_string());

    let (status, list) = admin_get_json(&app, "/admin/messages/?page=9999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["messages"], json!([]));
}

#[tokio::test]
async fn test_nlp_graph_page() {
    let (app, _dir) = test_app();

    for uri in ["/nlp-graph/", "/nlp-graph-static/"] {
        let (status, page) = get_html(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("<textarea id=\"sentence\""));
        assert!(page.contains("id=\"analyze\""));
        assert!(page.contains("id=\"random\""));
        assert!(page.contains("<svg id=\"svg\""));
        assert!(page.contains("/static/js/nlpgraph.js"));
        assert!(page.contains("/static/js/nlpGraphListeners.js"));
    }
}

#[tokio::test]
async fn test_storage_failure_is_generic_500() {
    let (app, dir) = test_app();

    let other = rusqlite::Connection::open(dir.path().join("db").join("cefg.db")).unwrap();
    other
        .execute_batch(
            "CREATE TRIGGER block_edges BEFORE INSERT ON edges BEGIN \
             SELECT RAISE(ABORT, 'edges blocked'); END;",
        )
        .unwrap();

    let (status, resp) = post_json(&app, "/save_graph/", cat_sat()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["error"], "Internal server error");

    let (_, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(stats["graphs"], 0);
    assert_eq!(stats["nodes"], 0);

    let (_, lookup) = post_json(&app, "/check_get_graph/", json!({"text": "cat sat"})).await;
    assert!(lookup["graph"].is_null());
}

#[tokio::test]
async fn test_node_type_links_with_reserved_characters() {
    let (app, _dir) = test_app();
    post_json(&app, "/save_graph/", graph_body("slash type", &["PUNCT/SYM", "NOUN"])).await;

    let (_, page) = get_html(&app, "/filter/").await;
    assert!(page.contains("href=\"/graphs/type/PUNCT%2FSYM/\""));

    let (status, page) = get_html(&app, "/graphs/type/PUNCT%2FSYM/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Found 1 graph(s)"));
    assert!(page.contains("slash type"));
}
