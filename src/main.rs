//! covid-query: a JSON query server for regional COVID-19 statistics
//!
//! The server loads a CSV dataset into memory once at startup and answers
//! queries over plain TCP:
//! - Case-insensitive substring search by region
//! - Case-sensitive substring search by date
//! - One task per client connection, any number of requests per connection
//! - Configuration via CLI arguments or TOML file

mod config;
mod dataset;
mod matcher;
mod protocol;
mod server;
mod storage;

use config::Config;
use server::Server;
use std::sync::Arc;
use storage::RecordStore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        dataset = %config.dataset.display(),
        workers = ?config.workers,
        "Starting covid-query server"
    );

    let records = dataset::load(&config.dataset).map_err(|e| {
        error!(error = %e, "Failed to load dataset");
        e
    })?;
    let store = RecordStore::new(records);
    if store.is_empty() {
        warn!("Dataset is empty, every query will return no records");
    }

    let runtime = build_runtime(config.workers)?;
    runtime.block_on(serve(config, store))
}

/// Build the multi-threaded tokio runtime
fn build_runtime(workers: Option<usize>) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = workers.filter(|&n| n > 0) {
        builder.worker_threads(workers);
    }
    builder.enable_all().build()
}

/// Bind the listener and serve until the process is terminated
async fn serve(
    config: Config,
    store: Arc<RecordStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let server = Server::bind(&config, store).await.map_err(|e| {
        error!(address = %config.listen, error = %e, "Failed to bind listener");
        e
    })?;

    server.run().await;
    Ok(())
}
