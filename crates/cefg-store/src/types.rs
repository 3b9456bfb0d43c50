//! Data types for stored graphs and messages.

use serde::{Deserialize, Serialize};

/// A graph row, without its nodes and edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: i64,
    /// Normalized source text (dedup key).
    pub text: String,
    pub created_at: i64,
}

/// A stored node, in the shape the front-end renderer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    #[serde(rename = "type")]
    pub node_type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A stored edge. Endpoints are stored node ids; the weight is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub source: i64,
    pub target: i64,
    #[serde(skip)]
    pub weight: f64,
}

/// Nodes and edges of one graph: `{nodes: [...], edges: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Graph listing entry used by the list and filter views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub id: i64,
    pub text: String,
    pub node_count: i64,
    pub edge_count: i64,
}

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new graph row was written.
    Created(i64),
    /// A graph with the same normalized text already existed.
    Existing(i64),
}

impl SaveOutcome {
    pub fn graph_id(&self) -> i64 {
        match *self {
            Self::Created(id) | Self::Existing(id) => id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// A contact-form message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: i64,
    pub is_read: bool,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_graphs: i64,
    pub total_nodes: i64,
    pub total_edges: i64,
    pub total_messages: i64,
    pub unread_messages: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
