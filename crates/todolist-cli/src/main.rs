//! todolist - a terminal client for a personal to-do list.
//!
//! Signs in against the identity endpoint, then lists, searches, adds, and
//! toggles tasks stored in the remote document store.

mod app;
mod commands;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use todolist_core::auth::FileSessionStore;
use todolist_core::{ApiClient, Config, SessionManager, TaskListState, TaskService};

use app::App;

/// Log file name in the cache directory
const LOG_FILE: &str = "todolist.log";

/// Initialize the tracing subscriber for logging.
/// Logs go to a file so they never interleave with the prompt.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        log_dir, LOG_FILE,
    ));

    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load configuration")?;
    let cache_dir = config.cache_dir()?;
    let _log_guard = init_tracing(&cache_dir)?;
    info!("todolist starting");

    let endpoints = config.endpoints()?;
    let client = Arc::new(ApiClient::new(endpoints).context("Failed to build HTTP client")?);

    let session = SessionManager::new(
        client.clone(),
        Box::new(FileSessionStore::new(cache_dir)),
    );
    session.restore();

    let tasks = TaskService::new(session.clone(), client, TaskListState::new());

    let mut app = App::new(config, session, tasks);
    let result = app.run().await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }

    info!("todolist shutting down");
    Ok(())
}
