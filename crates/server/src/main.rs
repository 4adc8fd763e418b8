//! obx-offline host entry point.
//!
//! Loads configuration, registers the offline agent (install, then
//! activate) and serves its lifecycle and fetch tools over MCP stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use obx_client::{FetchClient, FetchConfig};
use obx_core::{AppConfig, CacheDb, Network};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.generation,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting obx-offline host on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let runtime = Arc::new(host::HostRuntime::new(&config, db, network)?);

    if let Err(e) = runtime.register().await {
        tracing::warn!(error = %e, "agent registration failed; fetches fall through to the network");
    }

    let handler = handler::OfflineServer::new(runtime.clone());
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    // Let pending cache writes land before the process exits.
    runtime.agent().background().settle().await;

    Ok(())
}
