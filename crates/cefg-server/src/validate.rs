//! Database validation for the `cefg validate` subcommand.
//!
//! Opens an existing database read-only and checks that:
//! - every required table exists with the expected columns,
//! - no node or edge has lost its owning graph,
//! - no normalized text is stored twice.

use std::path::Path;

use cefg_core::config::DB_FILE_NAME;
use cefg_store::schema::REQUIRED_TABLES;
use rusqlite::Connection;
use tracing::{info, warn};

/// Result of a validation run.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub db_valid: bool,
    pub graphs: i64,
    pub nodes: i64,
    pub edges: i64,
    pub messages: i64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Columns each table must carry.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("graphs", &["id", "text", "created_at"]),
    ("nodes", &["id", "node_type", "text", "label"]),
    ("edges", &["id", "from_node", "to_node", "weight"]),
    ("graph_nodes", &["graph_id", "node_id"]),
    ("graph_edges", &["graph_id", "edge_id"]),
    (
        "messages",
        &["id", "name", "email", "subject", "message", "created_at", "is_read"],
    ),
];

/// Validate the database under `data_dir/db/`.
pub fn validate(data_dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    let db_path = data_dir.join("db").join(DB_FILE_NAME);
    if !db_path.exists() {
        report
            .errors
            .push(format!("Database not found: {}", db_path.display()));
        return report;
    }

    let conn = match Connection::open_with_flags(
        &db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    ) {
        Ok(c) => c,
        Err(e) => {
            report.errors.push(format!("Failed to open database: {}", e));
            return report;
        }
    };

    for table in REQUIRED_TABLES {
        match table_exists(&conn, table) {
            Ok(true) => {}
            Ok(false) => report
                .errors
                .push(format!("Missing required table: {}", table)),
            Err(e) => report
                .errors
                .push(format!("Error checking table {}: {}", table, e)),
        }
    }
    if !report.errors.is_empty() {
        return report;
    }

    for (table, columns) in REQUIRED_COLUMNS {
        let present = get_column_names(&conn, table);
        for col in *columns {
            if !present.iter().any(|c| c.as_str() == *col) {
                report
                    .errors
                    .push(format!("{} table missing column: {}", table, col));
            }
        }
    }
    if !report.errors.is_empty() {
        return report;
    }

    report.db_valid = true;
    report.graphs = count_rows(&conn, "graphs").unwrap_or(0);
    report.nodes = count_rows(&conn, "nodes").unwrap_or(0);
    report.edges = count_rows(&conn, "edges").unwrap_or(0);
    report.messages = count_rows(&conn, "messages").unwrap_or(0);

    let checks = [
        (
            "SELECT COUNT(*) FROM nodes WHERE id NOT IN (SELECT node_id FROM graph_nodes)",
            "nodes without a graph",
        ),
        (
            "SELECT COUNT(*) FROM edges WHERE id NOT IN (SELECT edge_id FROM graph_edges)",
            "edges without a graph",
        ),
        (
            "SELECT COUNT(*) FROM (SELECT text FROM graphs GROUP BY text HAVING COUNT(*) > 1)",
            "texts stored more than once",
        ),
    ];
    for (sql, what) in checks {
        match conn.query_row(sql, [], |row| row.get::<_, i64>(0)) {
            Ok(0) => {}
            Ok(n) => report.warnings.push(format!("{} {}", n, what)),
            Err(e) => report.warnings.push(format!("Check for {} failed: {}", what, e)),
        }
    }

    if report.warnings.is_empty() {
        info!("Database {} is valid", db_path.display());
    } else {
        warn!(
            "Database {} is valid with {} warning(s)",
            db_path.display(),
            report.warnings.len()
        );
    }
    report
}

/// Print a human-readable report to stdout.
pub fn print_report(report: &ValidationReport) {
    println!("=== CEFG Database Report ===");
    println!();
    println!("Database valid:     {}", if report.db_valid { "YES" } else { "NO" });
    println!("Graphs:             {}", report.graphs);
    println!("Nodes:              {}", report.nodes);
    println!("Edges:              {}", report.edges);
    println!("Messages:           {}", report.messages);

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("Errors:");
        for e in &report.errors {
            println!("  - {}", e);
        }
    }

    println!();
    if report.errors.is_empty() && report.db_valid {
        println!("Status: READY FOR USE");
    } else {
        println!("Status: INVALID");
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn get_column_names(conn: &Connection, table: &str) -> Vec<String> {
    // Table names come from REQUIRED_COLUMNS, never from input.
    let query = format!("PRAGMA table_info({})", table);
    let mut names = Vec::new();
    if let Ok(mut stmt) = conn.prepare(&query) {
        if let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(1)) {
            names.extend(rows.filter_map(|r| r.ok()));
        }
    }
    names
}

fn count_rows(conn: &Connection, table: &str) -> Result<i64, rusqlite::Error> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
}
