//! Install and activate.
//!
//! Install precaches the critical assets all-or-nothing, schedules the
//! secondary assets best-effort, and asks to skip waiting. Activate deletes
//! every partition outside the current allow-list and then claims clients.

use futures_util::future::try_join_all;
use serde::Serialize;
use std::sync::atomic::Ordering;

use harbor_core::{CacheRequest, CachedResponse, Error, PartitionRole};

use super::{OfflineWorker, WorkerState};

/// Result of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// Partition the assets were written to.
    pub partition: String,
    /// Number of critical assets stored.
    pub critical_cached: usize,
    /// Number of secondary assets handed to the background.
    pub secondary_scheduled: usize,
}

/// Result of a successful activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    /// Partitions deleted because they belong to another version.
    pub deleted: Vec<String>,
}

impl OfflineWorker {
    /// Handle the install event.
    ///
    /// Fails if any critical asset cannot be fetched, answers with an
    /// uncacheable status, or cannot be stored. Nothing is stored in that case
    /// and the worker becomes redundant; retrying is up to the host.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.set_state(WorkerState::Installing);

        match self.precache().await {
            Ok(report) => {
                self.inner.skip_waiting.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        let partition = self.inner.partitions.open(PartitionRole::Static).await?;

        let fetches = self.inner.manifest.critical.iter().map(|url| {
            let request = CacheRequest::get(url.clone());
            async move {
                let response = self
                    .inner
                    .network
                    .fetch(&request)
                    .await
                    .map_err(|e| Error::InstallFailed { url: request.url.to_string(), reason: e.to_string() })?;
                if !response.is_cacheable() {
                    return Err(Error::InstallFailed {
                        url: request.url.to_string(),
                        reason: format!("status {}", response.status),
                    });
                }
                Ok::<(CacheRequest, CachedResponse), Error>((request, response))
            }
        });
        let items = try_join_all(fetches).await?;

        partition.put_all(&items).await?;
        tracing::info!(partition = partition.name(), count = items.len(), "critical assets cached");

        let secondary = self.inner.manifest.secondary.clone();
        let secondary_scheduled = secondary.len();
        if !secondary.is_empty() {
            let worker = self.clone();
            self.inner.background.spawn("precache-secondary", async move {
                worker.precache_secondary(secondary).await;
                Ok(())
            });
        }

        Ok(InstallReport { partition: partition.name().to_string(), critical_cached: items.len(), secondary_scheduled })
    }

    /// Store each secondary asset on its own; one failure does not affect the rest.
    async fn precache_secondary(&self, urls: Vec<url::Url>) {
        for url in urls {
            let request = CacheRequest::get(url);
            let result = match self.inner.network.fetch(&request).await {
                Ok(response) if response.is_cacheable() => self.store(PartitionRole::Static, &request, &response).await,
                Ok(response) => Err(Error::Network(format!("status {}", response.status))),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => tracing::debug!(url = %request.url, "secondary asset cached"),
                Err(e) => tracing::warn!(url = %request.url, error = %e, "secondary asset skipped"),
            }
        }
    }

    /// Handle the activate event.
    ///
    /// Pruning finishes before clients are claimed.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = self.state();
        self.set_state(WorkerState::Activating);

        let deleted = match self.inner.partitions.prune().await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(error = %e, "activation failed while pruning");
                self.set_state(previous);
                return Err(e);
            }
        };
        for name in &deleted {
            tracing::info!(partition = %name, "deleted stale partition");
        }

        self.inner.clients_claimed.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Activated);

        Ok(ActivateReport { deleted })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ScriptedNetwork, test_config, worker_with};
    use super::*;
    use url::Url;

    fn get(url: &str) -> CacheRequest {
        CacheRequest::get(Url::parse(url).unwrap())
    }

    fn scripted_site() -> std::sync::Arc<ScriptedNetwork> {
        let network = ScriptedNetwork::new();
        network.respond("https://tools.example.com/", 200, "<html>home</html>");
        network.respond("https://tools.example.com/index.html", 200, "<html>index</html>");
        network.respond("https://tools.example.com/icon.png", 200, "png");
        network
    }

    #[tokio::test]
    async fn test_install_caches_critical_assets() {
        let worker = worker_with(scripted_site(), test_config()).await;

        let report = worker.install().await.unwrap();

        assert_eq!(report.partition, "static-v2");
        assert_eq!(report.critical_cached, 2);
        assert_eq!(report.secondary_scheduled, 1);
        assert_eq!(worker.state(), WorkerState::Installed);
        assert!(worker.skip_waiting_requested());

        let partition = worker.partitions().open(PartitionRole::Static).await.unwrap();
        let root = partition.get(&get("https://tools.example.com/")).await.unwrap().unwrap();
        assert_eq!(root.body, b"<html>home</html>");
    }

    #[tokio::test]
    async fn test_install_caches_secondary_in_background() {
        let worker = worker_with(scripted_site(), test_config()).await;

        worker.install().await.unwrap();
        worker.settle().await;

        let partition = worker.partitions().open(PartitionRole::Static).await.unwrap();
        assert!(partition.get(&get("https://tools.example.com/icon.png")).await.unwrap().is_some());
        assert_eq!(partition.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_install_fails_when_one_critical_asset_fails() {
        let network = scripted_site();
        network.fail("https://tools.example.com/index.html");
        let worker = worker_with(network, test_config()).await;

        let result = worker.install().await;

        assert!(matches!(result, Err(Error::InstallFailed { ref url, .. }) if url == "https://tools.example.com/index.html"));
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(!worker.skip_waiting_requested());

        let partition = worker.partitions().open(PartitionRole::Static).await.unwrap();
        assert_eq!(partition.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let network = scripted_site();
        network.respond("https://tools.example.com/index.html", 404, "missing");
        let worker = worker_with(network, test_config()).await;

        let result = worker.install().await;

        assert!(matches!(result, Err(Error::InstallFailed { reason, .. }) if reason == "status 404"));
    }

    #[tokio::test]
    async fn test_secondary_failure_does_not_fail_install() {
        let network = scripted_site();
        network.fail("https://tools.example.com/icon.png");
        let worker = worker_with(network, test_config()).await;

        worker.install().await.unwrap();
        worker.settle().await;

        assert_eq!(worker.state(), WorkerState::Installed);
        let partition = worker.partitions().open(PartitionRole::Static).await.unwrap();
        assert_eq!(partition.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_activate_prunes_stale_partitions() {
        let worker = worker_with(ScriptedNetwork::new(), test_config()).await;
        for name in ["static-v1", "dynamic-v1", "static-v2", "dynamic-v2", "legacy-v0"] {
            worker.partitions().open_named(name).await.unwrap();
        }

        let report = worker.activate().await.unwrap();

        let mut deleted = report.deleted.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["dynamic-v1".to_string(), "legacy-v0".to_string(), "static-v1".to_string()]);
        assert_eq!(worker.partitions().names().await.unwrap(), vec!["static-v2".to_string(), "dynamic-v2".to_string()]);
        assert_eq!(worker.state(), WorkerState::Activated);
        assert!(worker.clients_claimed());
    }

    #[tokio::test]
    async fn test_activate_with_nothing_stale() {
        let worker = worker_with(scripted_site(), test_config()).await;
        worker.install().await.unwrap();

        let report = worker.activate().await.unwrap();

        assert!(report.deleted.is_empty());
        assert!(worker.partitions().has("static-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_version_bump_invalidates_previous_deployment() {
        let network = scripted_site();
        let db = harbor_core::CacheDb::open_in_memory().await.unwrap();

        let v2 = super::super::OfflineWorker::new(&test_config(), db.clone(), network.clone()).unwrap();
        v2.install().await.unwrap();
        v2.activate().await.unwrap();
        v2.settle().await;

        let config = harbor_core::AppConfig { cache_version: "v3".into(), ..test_config() };
        let v3 = super::super::OfflineWorker::new(&config, db, network).unwrap();
        v3.install().await.unwrap();
        let report = v3.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["static-v2".to_string()]);
        assert_eq!(v3.partitions().names().await.unwrap(), vec!["static-v3".to_string()]);
    }
}
