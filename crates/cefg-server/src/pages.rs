//! Server-rendered HTML pages.
//!
//! Pages are plain strings. Every value coming from the database goes through
//! [`escape`] before it is written into markup.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use cefg_store::{GraphData, GraphRecord, GraphSummary};
use tracing::error;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode a value for use as one URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title} | CEFG</title>\n\
         <link rel=\"stylesheet\" href=\"/static/css/main.css\">\n\
         </head>\n<body>\n\
         <nav><a href=\"/\">Home</a> <a href=\"/nlp-graph/\">Text to graph</a> \
         <a href=\"/graphs/\">Graphs</a> \
         <a href=\"/filter/\">Filter by type</a> \
         <a href=\"/filter/by-node-count/\">Filter by size</a></nav>\n\
         <main>\n<h1>{title}</h1>\n{body}</main>\n</body>\n</html>\n",
        title = escape(title),
        body = body,
    )
}

fn summary_list(graphs: &[GraphSummary], empty: &str) -> String {
    if graphs.is_empty() {
        return format!("<p class=\"empty-state\">{}</p>\n", escape(empty));
    }
    let mut out = String::from("<ul class=\"graph-list\">\n");
    for g in graphs {
        out.push_str(&format!(
            "<li class=\"graph-item\" data-id=\"{id}\">\
             <a href=\"/graphs/{id}/\"><strong>Graph #{id}</strong></a> \
             <span class=\"graph-text\">{text}</span> \
             <span class=\"graph-meta\">{nodes} nodes, {edges} edges</span> \
             <a class=\"graph-json\" href=\"/graphs/{id}/json/\">json</a></li>\n",
            id = g.id,
            text = escape(&g.text),
            nodes = g.node_count,
            edges = g.edge_count,
        ));
    }
    out.push_str("</ul>\n");
    out
}

/// Graph canvas with nodes and edges embedded as data attributes for the renderer script.
fn graph_canvas(data: &GraphData) -> String {
    let nodes = serde_json::to_string(&data.nodes).unwrap_or_else(|_| "[]".to_string());
    let edges = serde_json::to_string(&data.edges).unwrap_or_else(|_| "[]".to_string());
    format!(
        "<div id=\"graph-data\" data-nodes=\"{}\" data-edges=\"{}\"></div>\n\
         <svg id=\"svg\" width=\"800\" height=\"500\"></svg>\n\
         <script src=\"/static/js/nlpgraph.js\"></script>\n\
         <script src=\"/static/js/graph_detail.js\"></script>\n",
        escape(&nodes),
        escape(&edges),
    )
}

fn node_table(data: &GraphData) -> String {
    let mut out = String::from(
        "<table class=\"nodes\">\n<tr><th>id</th><th>type</th><th>text</th></tr>\n",
    );
    for n in &data.nodes {
        out.push_str(&format!(
            "<tr><td>{}</td><td><a href=\"/graphs/type/{}/\">{}</a></td><td>{}</td></tr>\n",
            n.id,
            encode_path_segment(&n.node_type),
            escape(&n.node_type),
            escape(&n.text),
        ));
    }
    out.push_str("</table>\n");
    out
}

/// Landing page showing the first stored graph.
pub fn home(first: Option<(&GraphRecord, &GraphData)>) -> String {
    match first {
        Some((graph, data)) => {
            let body = format!(
                "<p class=\"graph-text\">{}</p>\n{}",
                escape(&graph.text),
                graph_canvas(data),
            );
            layout("CEFG", &body)
        }
        None => layout(
            "CEFG",
            "<p class=\"empty-state\">No graphs have been saved yet.</p>\n",
        ),
    }
}

/// The in-browser text-to-graph tool. Its scripts read `#sentence` and
/// draw into `#svg`, then post results to `/save_graph/`.
pub fn nlp_graph() -> String {
    let body = "<textarea id=\"sentence\" rows=\"4\" cols=\"80\" \
                placeholder=\"Type a sentence\"></textarea>\n\
                <div class=\"controls\">\
                <button id=\"analyze\" type=\"button\">Analyze</button> \
                <button id=\"random\" type=\"button\">Random sentence</button></div>\n\
                <svg id=\"svg\" width=\"800\" height=\"500\"></svg>\n\
                <script src=\"/static/js/nlpgraph.js\"></script>\n\
                <script src=\"/static/js/nlpGraphListeners.js\"></script>\n";
    layout("Text to graph", body)
}

pub fn graphs_list(graphs: &[GraphSummary]) -> String {
    let body = format!(
        "<p>{} graph(s)</p>\n{}",
        graphs.len(),
        summary_list(graphs, "No graphs have been saved yet."),
    );
    layout("Graphs", &body)
}

pub fn graph_detail(graph: &GraphRecord, data: &GraphData) -> String {
    let created = chrono::DateTime::from_timestamp_millis(graph.created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default();
    let body = format!(
        "<p class=\"graph-text\">{}</p>\n\
         <p class=\"graph-meta\">{} nodes, {} edges, saved {}. \
         <a href=\"/graphs/{}/json/\">json</a></p>\n{}{}",
        escape(&graph.text),
        data.nodes.len(),
        data.edges.len(),
        escape(&created),
        graph.id,
        graph_canvas(data),
        node_table(data),
    );
    layout(&format!("Graph #{}", graph.id), &body)
}

/// Node type picker; the filter script fetches `/filter/?node_type=...` on change.
pub fn filter_types(types: &[String]) -> String {
    let mut body = String::from(
        "<select id=\"type-select\">\n<option value=\"\">Select a node type</option>\n",
    );
    for t in types {
        body.push_str(&format!(
            "<option value=\"{t}\">{t}</option>\n",
            t = escape(t)
        ));
    }
    body.push_str("</select>\n<ul class=\"type-links\">\n");
    for t in types {
        body.push_str(&format!(
            "<li><a href=\"/graphs/type/{}/\">{}</a></li>\n",
            encode_path_segment(t),
            escape(t)
        ));
    }
    body.push_str(
        "</ul>\n<div id=\"results-container\">\
         <p class=\"empty-state\">Select a node type to see matching graphs.</p></div>\n\
         <script src=\"/static/js/filter_by_type.js\"></script>\n",
    );
    layout("Filter by node type", &body)
}

pub fn graphs_by_type(node_type: &str, graphs: &[GraphSummary]) -> String {
    let body = format!(
        "<p>Found {} graph(s) with \"{}\" nodes</p>\n{}",
        graphs.len(),
        escape(node_type),
        summary_list(graphs, "No graphs contain nodes of this type."),
    );
    layout(&format!("Graphs with {} nodes", node_type), &body)
}

pub fn filter_counts(counts: &[i64]) -> String {
    let mut body = String::new();
    if counts.is_empty() {
        body.push_str("<p class=\"empty-state\">No graphs have been saved yet.</p>\n");
    } else {
        body.push_str("<ul class=\"count-links\">\n");
        for c in counts {
            body.push_str(&format!(
                "<li><a href=\"/graphs/node-count/{c}/\">{c} node(s)</a></li>\n"
            ));
        }
        body.push_str("</ul>\n");
    }
    layout("Filter by node count", &body)
}

pub fn graphs_by_node_count(node_count: i64, graphs: &[GraphSummary]) -> String {
    let body = summary_list(graphs, "No graphs have this many nodes.");
    layout(&format!("Graphs with {} node(s)", node_count), &body)
}

/// 404 page.
pub fn not_found(message: &str) -> Response {
    let body = format!("<p class=\"empty-state\">{}</p>\n", escape(message));
    (StatusCode::NOT_FOUND, Html(layout("Not found", &body))).into_response()
}

/// 500 page. The error itself is only logged.
pub fn server_error(err: cefg_core::Error) -> Response {
    error!("Page render failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(layout(
            "Server error",
            "<p class=\"empty-state\">Something went wrong.</p>\n",
        )),
    )
        .into_response()
}
