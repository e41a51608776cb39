//! harbor server entry point.
//!
//! This is the main binary that boots the offline cache worker and serves it
//! over MCP on stdio transport. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use harbor_client::{FetchClient, FetchConfig, OfflineWorker};
use harbor_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
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
        origin = %config.origin,
        db_path = %config.db_path.display(),
        version = %config.cache_version,
        "Starting harbor server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app_config(&config))?;
    let worker = OfflineWorker::new(&config, db, Arc::new(network))?;

    // A failed install leaves the previous partitions in place; the worker still serves from them.
    match worker.on_install().await? {
        Ok(report) => {
            tracing::info!(partition = %report.partition, critical = report.critical_cached, "install complete");
            match worker.on_activate().await? {
                Ok(report) => tracing::info!(deleted = report.deleted.len(), "activation complete"),
                Err(e) => tracing::error!(error = %e, "activation failed"),
            }
        }
        Err(e) => tracing::error!(error = %e, "install failed, serving existing partitions"),
    }

    let handler = handler::HarborServer::new(worker.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    drain(&worker).await;

    Ok(())
}

/// Wait for detached cache writes and refreshes before exiting.
async fn drain(worker: &OfflineWorker) {
    let pending = worker.background().pending();
    if pending > 0 {
        tracing::info!(pending, "waiting for background tasks");
    }
    worker.settle().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, worker as test_worker};
    use harbor_core::PartitionRole;

    #[tokio::test]
    async fn test_drain_finishes_secondary_precache() {
        let network = StubNetwork::site();
        network.respond("https://tools.example.com/icon.png", "image/png", "png");
        let config = AppConfig {
            secondary_assets: vec!["/icon.png".into()],
            ..crate::tools::testing::test_config()
        };
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(&config, db, network).unwrap();

        worker.install().await.unwrap();
        drain(&worker).await;

        assert_eq!(worker.background().pending(), 0);
        let partition = worker.partitions().open(PartitionRole::Static).await.unwrap();
        assert_eq!(partition.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_drain_with_nothing_pending() {
        let worker = test_worker(StubNetwork::site()).await;
        drain(&worker).await;
        assert_eq!(worker.background().pending(), 0);
    }
}
