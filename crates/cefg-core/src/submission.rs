//! Request payloads accepted by the graph and contact endpoints.
//!
//! Bodies are parsed into a `serde_json::Value` first so that every missing or
//! mistyped field can be reported by name instead of as a generic decode error.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::text::{normalize_text, MAX_TEXT_LEN};

/// Stored when a submitted node carries no text.
pub const DEFAULT_NODE_TEXT: &str = "Unknown";

/// Weight given to edges submitted without one.
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;

/// Body of a graph lookup: `{text}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    /// Normalized source text.
    pub text: String,
}

impl TextQuery {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let obj = parse_object(body)?;
        Ok(Self {
            text: required_text(&obj)?,
        })
    }
}

/// One node of a submitted graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSubmission {
    /// Id chosen by the client, only meaningful inside its own submission.
    pub key: String,
    pub node_type: String,
    pub text: String,
    pub label: Option<String>,
}

/// One edge of a submitted graph, endpoints given as submission ids.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSubmission {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// A validated `{text, graph: {nodes, edges}}` body.
///
/// Construction guarantees that node keys are unique and that every edge
/// endpoint names one of the submitted nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSubmission {
    /// Normalized source text, the dedup key.
    pub text: String,
    pub nodes: Vec<NodeSubmission>,
    pub edges: Vec<EdgeSubmission>,
}

impl GraphSubmission {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let obj = parse_object(body)?;
        let text = required_text(&obj)?;

        let graph = match obj.get("graph") {
            Some(Value::Object(graph)) => graph,
            None | Some(Value::Null) => return Err(Error::validation("Missing graph")),
            Some(_) => return Err(Error::validation("graph must be an object")),
        };

        let (raw_nodes, raw_edges) = match (graph.get("nodes"), graph.get("edges")) {
            (Some(Value::Array(nodes)), Some(Value::Array(edges))) => (nodes, edges),
            _ => {
                return Err(Error::validation(
                    "graph.nodes and graph.edges must be lists",
                ))
            }
        };

        let mut keys = HashSet::with_capacity(raw_nodes.len());
        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for (i, raw) in raw_nodes.iter().enumerate() {
            let node = parse_node(i, raw)?;
            if !keys.insert(node.key.clone()) {
                return Err(Error::validation(format!(
                    "Duplicate node id: {}",
                    node.key
                )));
            }
            nodes.push(node);
        }

        let mut edges = Vec::with_capacity(raw_edges.len());
        for (i, raw) in raw_edges.iter().enumerate() {
            let edge = parse_edge(i, raw)?;
            for endpoint in [&edge.source, &edge.target] {
                if !keys.contains(endpoint) {
                    return Err(Error::validation(format!(
                        "Edge {} references unknown node: {}",
                        i, endpoint
                    )));
                }
            }
            edges.push(edge);
        }

        Ok(Self { text, nodes, edges })
    }
}

/// A contact-form message: `{name, email, subject, message}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactSubmission {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let obj = parse_object(body)?;

        let name = required_field(&obj, "name")?;
        let email = required_field(&obj, "email")?;
        let subject = required_field(&obj, "subject")?;
        let message = required_field(&obj, "message")?;

        if !email.contains('@') {
            return Err(Error::validation("email is not a valid address"));
        }
        if message.chars().count() > MAX_TEXT_LEN {
            return Err(Error::validation(format!(
                "message exceeds {} characters",
                MAX_TEXT_LEN
            )));
        }

        Ok(Self {
            name,
            email,
            subject,
            message,
        })
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::validation("Request body must be a JSON object")),
        Err(_) => Err(Error::validation("Invalid JSON")),
    }
}

fn required_text(obj: &Map<String, Value>) -> Result<String> {
    let raw = match obj.get("text") {
        Some(Value::String(s)) => s,
        None | Some(Value::Null) => return Err(Error::validation("Missing text")),
        Some(_) => return Err(Error::validation("text must be a string")),
    };

    // Limit applies to what the client sent; lowercasing can lengthen some characters.
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("text must not be empty"));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(Error::validation(format!(
            "text exceeds {} characters",
            MAX_TEXT_LEN
        )));
    }
    Ok(normalize_text(trimmed))
}

fn required_field(obj: &Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(Error::validation(format!("Missing {}", field)))
        }
        Some(_) => Err(Error::validation(format!("{} must be a string", field))),
    }
}

/// Node ids may arrive as strings (`"e0"`) or integers (`1`).
fn node_key(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn optional_string(obj: &Map<String, Value>, field: &str, owner: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::validation(format!(
            "{}: {} must be a string",
            owner, field
        ))),
    }
}

fn parse_node(index: usize, raw: &Value) -> Result<NodeSubmission> {
    let owner = format!("Node {}", index);
    let Value::Object(obj) = raw else {
        return Err(Error::validation(format!("{} must be an object", owner)));
    };

    let key = node_key(obj.get("id"))
        .ok_or_else(|| Error::validation(format!("{} is missing an id", owner)))?;
    let node_type = match optional_string(obj, "type", &owner)? {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(Error::validation(format!("{} is missing a type", owner))),
    };
    let text = optional_string(obj, "text", &owner)?
        .unwrap_or_else(|| DEFAULT_NODE_TEXT.to_string());
    let label = optional_string(obj, "label", &owner)?;

    Ok(NodeSubmission {
        key,
        node_type,
        text,
        label,
    })
}

fn parse_edge(index: usize, raw: &Value) -> Result<EdgeSubmission> {
    let Value::Object(obj) = raw else {
        return Err(Error::validation(format!("Edge {} must be an object", index)));
    };

    let source = node_key(obj.get("source"))
        .ok_or_else(|| Error::validation(format!("Edge {} is missing a source", index)))?;
    let target = node_key(obj.get("target"))
        .ok_or_else(|| Error::validation(format!("Edge {} is missing a target", index)))?;
    let weight = match obj.get("weight") {
        None | Some(Value::Null) => DEFAULT_EDGE_WEIGHT,
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|w| w.is_finite())
            .ok_or_else(|| Error::validation(format!("Edge {}: weight is out of range", index)))?,
        Some(_) => {
            return Err(Error::validation(format!(
                "Edge {}: weight must be a number",
                index
            )))
        }
    };

    Ok(EdgeSubmission {
        source,
        target,
        weight,
    })
}
