//! Database schema SQL.

/// Graph tables. A graph owns its nodes and edges through the link tables.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS graphs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_type TEXT NOT NULL DEFAULT 'Unknown',
    text TEXT NOT NULL DEFAULT 'Unknown',
    label TEXT
);

CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_node INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    to_node INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    weight REAL NOT NULL DEFAULT 1.0
);

CREATE TABLE IF NOT EXISTS graph_nodes (
    graph_id INTEGER NOT NULL REFERENCES graphs(id) ON DELETE CASCADE,
    node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    PRIMARY KEY (graph_id, node_id)
);

CREATE TABLE IF NOT EXISTS graph_edges (
    graph_id INTEGER NOT NULL REFERENCES graphs(id) ON DELETE CASCADE,
    edge_id INTEGER NOT NULL REFERENCES edges(id) ON DELETE CASCADE,
    PRIMARY KEY (graph_id, edge_id)
);

CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(node_type);
CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_node);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_node);
CREATE INDEX IF NOT EXISTS idx_graph_nodes_node ON graph_nodes(node_id);
CREATE INDEX IF NOT EXISTS idx_graph_edges_edge ON graph_edges(edge_id);
"#;

/// Contact-form messages.
pub const MESSAGES_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    subject TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at);
CREATE INDEX IF NOT EXISTS idx_messages_read ON messages(is_read);
"#;

/// Deleting a graph removes the nodes it owns; edges and link rows follow by cascade.
pub const GRAPH_TRIGGERS_SQL: &str = r#"
CREATE TRIGGER IF NOT EXISTS graphs_bd BEFORE DELETE ON graphs BEGIN
    DELETE FROM nodes WHERE id IN (
        SELECT node_id FROM graph_nodes WHERE graph_id = old.id
    );
END;
"#;

/// Tables a valid database must contain.
pub const REQUIRED_TABLES: &[&str] = &[
    "graphs",
    "nodes",
    "edges",
    "graph_nodes",
    "graph_edges",
    "messages",
];
