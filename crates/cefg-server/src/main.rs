//! CEFG: graph store server for the in-browser text-to-graph tool.

use std::path::PathBuf;
use std::sync::Arc;

use cefg_server::{build_router, validate, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("CEFG_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn print_help() {
    println!("CEFG: graph store server");
    println!();
    println!("Usage: cefg [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the server");
    println!("  validate [data-dir]      Validate an existing database");
    println!("  help                     Show this help message");
    println!();
    println!("Environment:");
    println!("  PORT, CEFG_HOST          Listen address (default 0.0.0.0:8000)");
    println!("  CEFG_DATA_DIR            Data directory (database under db/)");
    println!("  CEFG_STATIC_DIR          Directory served under /static");
    println!("  CEFG_ADMIN_TOKEN         Enables admin routes; send as x-admin-token");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--validate" | "validate" => {
                let data_dir = args
                    .get(2)
                    .map(PathBuf::from)
                    .unwrap_or_else(resolve_data_dir);
                let report = validate::validate(&data_dir);
                validate::print_report(&report);
                std::process::exit(if report.db_valid { 0 } else { 1 });
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'cefg help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = cefg_core::CefgConfig::from_env(&data_dir)?;
    let store = cefg_store::SqliteStore::open(&config.data_paths.db_dir)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, store));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("CEFG server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
