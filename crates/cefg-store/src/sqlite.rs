//! SQLite-backed store for graphs, nodes, edges, and contact messages.
//!
//! One connection guarded by a mutex. A save runs its dedup lookup and all of
//! its inserts in a single transaction while holding the lock, so concurrent
//! saves of the same text resolve to one graph row.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cefg_core::config::DB_FILE_NAME;
use cefg_core::{Error, GraphSubmission, Result};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::schema::{GRAPH_TRIGGERS_SQL, MESSAGES_SCHEMA_SQL, SCHEMA_SQL};
use crate::types::*;

/// Graph listing with per-graph node and edge counts. Callers append a WHERE clause.
const SUMMARY_SELECT: &str = "SELECT g.id, g.text, \
     (SELECT COUNT(*) FROM graph_nodes gn WHERE gn.graph_id = g.id) AS node_count, \
     (SELECT COUNT(*) FROM graph_edges ge WHERE ge.graph_id = g.id) AS edge_count \
     FROM graphs g";

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

/// LIMIT and OFFSET for a 1-based page, or a validation error when they overflow `i64`.
fn page_window(page: usize, page_size: usize) -> Result<(i64, i64)> {
    let offset = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .and_then(|o| i64::try_from(o).ok());
    match (i64::try_from(page_size).ok(), offset) {
        (Some(limit), Some(offset)) => Ok((limit, offset)),
        _ => Err(Error::validation("page is out of range")),
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// SQLite store for extracted graphs.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/cefg.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join(DB_FILE_NAME);

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteStore initialized: {} graphs, path={}",
            store.count_graphs()?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!(
            "{}\n{}\n{}",
            SCHEMA_SQL, MESSAGES_SCHEMA_SQL, GRAPH_TRIGGERS_SQL
        );
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ---------------------------------------------------------------
    // Graph writes
    // ---------------------------------------------------------------

    /// Store a validated submission unless a graph with the same text exists.
    ///
    /// Nodes get fresh store ids; submission ids are only used to resolve the
    /// edges of this request. Nothing is written if any insert fails.
    pub fn save_graph(&self, submission: &GraphSubmission) -> Result<SaveOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        if let Some(id) = Self::graph_id_for_text(&tx, &submission.text)? {
            debug!("Graph {} already stores this text", id);
            return Ok(SaveOutcome::Existing(id));
        }

        let graph_id = match tx
            .prepare_cached("INSERT INTO graphs (text, created_at) VALUES (?1, ?2)")
            .map_err(db_err)?
            .insert(params![submission.text, now_millis()])
        {
            Ok(id) => id,
            // Another writer on the same file got there first.
            Err(e) if e.to_string().contains("UNIQUE constraint") => {
                return Self::graph_id_for_text(&tx, &submission.text)?
                    .map(SaveOutcome::Existing)
                    .ok_or_else(|| Error::Database(e.to_string()));
            }
            Err(e) => return Err(db_err(e)),
        };

        {
            let mut insert_node = tx
                .prepare_cached("INSERT INTO nodes (node_type, text, label) VALUES (?1, ?2, ?3)")
                .map_err(db_err)?;
            let mut link_node = tx
                .prepare_cached("INSERT INTO graph_nodes (graph_id, node_id) VALUES (?1, ?2)")
                .map_err(db_err)?;

            let mut stored_ids: HashMap<&str, i64> = HashMap::with_capacity(submission.nodes.len());
            for node in &submission.nodes {
                let node_id = insert_node
                    .insert(params![node.node_type, node.text, node.label])
                    .map_err(db_err)?;
                link_node
                    .execute(params![graph_id, node_id])
                    .map_err(db_err)?;
                stored_ids.insert(node.key.as_str(), node_id);
            }

            let mut insert_edge = tx
                .prepare_cached("INSERT INTO edges (from_node, to_node, weight) VALUES (?1, ?2, ?3)")
                .map_err(db_err)?;
            let mut link_edge = tx
                .prepare_cached("INSERT INTO graph_edges (graph_id, edge_id) VALUES (?1, ?2)")
                .map_err(db_err)?;

            for (i, edge) in submission.edges.iter().enumerate() {
                let resolve = |key: &str| {
                    stored_ids.get(key).copied().ok_or_else(|| {
                        Error::validation(format!("Edge {} references unknown node: {}", i, key))
                    })
                };
                let from = resolve(edge.source.as_str())?;
                let to = resolve(edge.target.as_str())?;
                let edge_id = insert_edge
                    .insert(params![from, to, edge.weight])
                    .map_err(db_err)?;
                link_edge
                    .execute(params![graph_id, edge_id])
                    .map_err(db_err)?;
            }
        }

        tx.commit().map_err(db_err)?;
        info!(
            "Saved graph {}: {} nodes, {} edges",
            graph_id,
            submission.nodes.len(),
            submission.edges.len()
        );
        Ok(SaveOutcome::Created(graph_id))
    }

    /// Delete a graph together with the nodes and edges it owns.
    pub fn delete_graph(&self, graph_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM graphs WHERE id = ?1", params![graph_id])
            .map_err(db_err)?;
        if count > 0 {
            info!("Deleted graph {}", graph_id);
        }
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Graph reads
    // ---------------------------------------------------------------

    fn graph_id_for_text(conn: &Connection, text: &str) -> Result<Option<i64>> {
        let id = conn
            .prepare_cached("SELECT id FROM graphs WHERE text = ?1")
            .map_err(db_err)?
            .query_row(params![text], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        Ok(id)
    }

    /// Find a graph by its normalized text.
    pub fn find_graph_by_text(&self, text: &str) -> Result<Option<GraphRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT id, text, created_at FROM graphs WHERE text = ?1")
            .map_err(db_err)?
            .query_row(params![text], Self::row_to_graph)
            .optional()
            .map_err(db_err)?;
        Ok(row)
    }

    /// Get a graph by ID.
    pub fn get_graph(&self, graph_id: i64) -> Result<Option<GraphRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT id, text, created_at FROM graphs WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![graph_id], Self::row_to_graph)
            .optional()
            .map_err(db_err)?;
        Ok(row)
    }

    /// The graph with the lowest id, if any.
    pub fn first_graph(&self) -> Result<Option<GraphRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT id, text, created_at FROM graphs ORDER BY id LIMIT 1")
            .map_err(db_err)?
            .query_row([], Self::row_to_graph)
            .optional()
            .map_err(db_err)?;
        Ok(row)
    }

    /// Nodes and edges owned by a graph, each ordered by id.
    pub fn graph_data(&self, graph_id: i64) -> Result<GraphData> {
        let conn = self.conn.lock();

        let nodes = conn
            .prepare_cached(
                "SELECT n.id, n.node_type, n.text, n.label FROM nodes n \
                 JOIN graph_nodes gn ON gn.node_id = n.id \
                 WHERE gn.graph_id = ?1 ORDER BY n.id",
            )
            .map_err(db_err)?
            .query_map(params![graph_id], |row| {
                Ok(Node {
                    id: row.get(0)?,
                    node_type: row.get(1)?,
                    text: row.get(2)?,
                    label: row.get(3)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        let edges = conn
            .prepare_cached(
                "SELECT e.from_node, e.to_node, e.weight FROM edges e \
                 JOIN graph_edges ge ON ge.edge_id = e.id \
                 WHERE ge.graph_id = ?1 ORDER BY e.id",
            )
            .map_err(db_err)?
            .query_map(params![graph_id], |row| {
                Ok(Edge {
                    source: row.get(0)?,
                    target: row.get(1)?,
                    weight: row.get(2)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        Ok(GraphData { nodes, edges })
    }

    /// Stored graph for a normalized text, with its nodes and edges.
    pub fn lookup_graph(&self, text: &str) -> Result<Option<(GraphRecord, GraphData)>> {
        match self.find_graph_by_text(text)? {
            Some(graph) => {
                let data = self.graph_data(graph.id)?;
                Ok(Some((graph, data)))
            }
            None => Ok(None),
        }
    }

    /// Count total graphs.
    pub fn count_graphs(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM graphs")
    }

    fn count(&self, sql: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(sql, [], |row| row.get(0)).map_err(db_err)?;
        Ok(count)
    }

    // ---------------------------------------------------------------
    // Listing and filters
    // ---------------------------------------------------------------

    /// All graphs ordered by id.
    pub fn list_graphs(&self) -> Result<Vec<GraphSummary>> {
        self.summaries(&format!("{} ORDER BY g.id", SUMMARY_SELECT), params![])
    }

    /// Graphs containing at least one node of `node_type`.
    pub fn graphs_with_node_type(&self, node_type: &str) -> Result<Vec<GraphSummary>> {
        let sql = format!(
            "{} WHERE EXISTS (SELECT 1 FROM graph_nodes gn JOIN nodes n ON n.id = gn.node_id \
             WHERE gn.graph_id = g.id AND n.node_type = ?1) ORDER BY g.id",
            SUMMARY_SELECT
        );
        self.summaries(&sql, params![node_type])
    }

    /// Graphs owning exactly `node_count` nodes.
    pub fn graphs_with_node_count(&self, node_count: i64) -> Result<Vec<GraphSummary>> {
        let sql = format!(
            "{} WHERE (SELECT COUNT(*) FROM graph_nodes gn WHERE gn.graph_id = g.id) = ?1 \
             ORDER BY g.id",
            SUMMARY_SELECT
        );
        self.summaries(&sql, params![node_count])
    }

    fn summaries(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<GraphSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok(GraphSummary {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    node_count: row.get(2)?,
                    edge_count: row.get(3)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Distinct node types across all graphs, sorted.
    pub fn node_types(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT node_type FROM nodes ORDER BY node_type")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>().map_err(db_err)
    }

    /// Distinct per-graph node counts, ascending.
    pub fn node_counts(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT (SELECT COUNT(*) FROM graph_nodes gn WHERE gn.graph_id = g.id) AS c \
                 FROM graphs g ORDER BY c",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<i64>>>().map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Messages
    // ---------------------------------------------------------------

    /// Insert a contact message. Returns the new message ID.
    pub fn add_message(&self, msg: &cefg_core::ContactSubmission) -> Result<i64> {
        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO messages (name, email, subject, message, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(db_err)?
            .insert(params![msg.name, msg.email, msg.subject, msg.message, now_millis()])
            .map_err(db_err)?;
        debug!("Stored message {} from {}", id, msg.email);
        Ok(id)
    }

    /// Get a message by ID.
    pub fn get_message(&self, message_id: i64) -> Result<Option<Message>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM messages WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![message_id], Self::row_to_message)
            .optional()
            .map_err(db_err)?;
        Ok(row)
    }

    /// Messages newest first, optionally filtered by read flag. Returns (messages, total_count).
    pub fn list_messages(
        &self,
        is_read: Option<bool>,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<Message>, i64)> {
        let (limit, offset) = page_window(page, page_size)?;
        let conn = self.conn.lock();

        let total: i64 = conn
            .prepare_cached("SELECT COUNT(*) FROM messages WHERE (?1 IS NULL OR is_read = ?1)")
            .map_err(db_err)?
            .query_row(params![is_read], |row| row.get(0))
            .map_err(db_err)?;

        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM messages WHERE (?1 IS NULL OR is_read = ?1) \
                 ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            )
            .map_err(db_err)?;
        let messages = stmt
            .query_map(
                params![is_read, limit, offset],
                Self::row_to_message,
            )
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        Ok((messages, total))
    }

    /// Set the read flag on the given messages. Returns the number of rows updated.
    pub fn set_messages_read(&self, ids: &[i64], is_read: bool) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE messages SET is_read = {} WHERE id IN ({})",
            i32::from(is_read),
            placeholders
        );
        let conn = self.conn.lock();
        let updated = conn
            .execute(&sql, params_from_iter(ids.iter()))
            .map_err(db_err)?;
        info!("Marked {} message(s) is_read={}", updated, is_read);
        Ok(updated)
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    pub fn get_stats(&self) -> Result<StoreStats> {
        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StoreStats {
            total_graphs: self.count_graphs()?,
            total_nodes: self.count("SELECT COUNT(*) FROM nodes")?,
            total_edges: self.count("SELECT COUNT(*) FROM edges")?,
            total_messages: self.count("SELECT COUNT(*) FROM messages")?,
            unread_messages: self.count("SELECT COUNT(*) FROM messages WHERE is_read = 0")?,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    fn row_to_graph(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphRecord> {
        Ok(GraphRecord {
            id: row.get("id")?,
            text: row.get("text")?,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
        Ok(Message {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            subject: row.get("subject")?,
            message: row.get("message")?,
            created_at: row.get("created_at")?,
            is_read: row.get::<_, i64>("is_read")? != 0,
        })
    }
}
