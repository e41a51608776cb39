//! Per-category caching strategies.
//!
//! Only the main path of a strategy can fail the request, and only where no
//! fallback exists. Cache reads that fail on the main path count as misses;
//! cache writes and refreshes run detached and only log.

use harbor_core::{CacheRequest, CachedResponse, Error, Partition, PartitionRole};

use super::{OfflineWorker, Served, ServedFrom};

impl OfflineWorker {
    /// Write a response into the current partition of `role`.
    ///
    /// Uncacheable responses are skipped. Writes to the dynamic partition
    /// trim it to the configured bound.
    pub(crate) async fn store(
        &self, role: PartitionRole, request: &CacheRequest, response: &CachedResponse,
    ) -> Result<(), Error> {
        if !response.is_cacheable() {
            tracing::debug!(url = %request.url, status = response.status, "response not cacheable");
            return Ok(());
        }

        let partition = self.inner.partitions.open(role).await?;
        partition.put(request, response).await?;

        if role == PartitionRole::Dynamic
            && let Some(max) = self.inner.dynamic_max_entries
        {
            let evicted = partition.trim(max).await?;
            if evicted > 0 {
                tracing::debug!(partition = partition.name(), evicted, "dynamic partition trimmed");
            }
        }

        Ok(())
    }

    /// Spawn a detached write.
    fn store_detached(&self, label: &'static str, role: PartitionRole, request: CacheRequest, response: CachedResponse) {
        let worker = self.clone();
        self.inner
            .background
            .spawn(label, async move { worker.store(role, &request, &response).await });
    }

    async fn lookup_any(&self, request: &CacheRequest) -> Option<CachedResponse> {
        match self.inner.partitions.match_any(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn lookup_in(&self, partition: &Partition, request: &CacheRequest) -> Option<CachedResponse> {
        match partition.get(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, partition = partition.name(), error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Navigation: network first, then the exact cached page, then the root document.
    ///
    /// Only transport failures fall back to the cache; a request the network
    /// layer rejects outright is returned as is.
    pub(crate) async fn network_first(&self, request: CacheRequest) -> Result<Served, Error> {
        let err = match self.inner.network.fetch(&request).await {
            Ok(response) => {
                self.store_detached("navigation-store", PartitionRole::Dynamic, request, response.clone());
                return Ok(Served::network(response));
            }
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        tracing::debug!(url = %request.url, error = %err, "navigation offline, trying cache");

        if let Some(hit) = self.lookup_any(&request).await {
            return Ok(Served::cache(hit));
        }

        let root = CacheRequest::get(self.inner.manifest.root.clone());
        if let Some(hit) = self.lookup_any(&root).await {
            tracing::debug!(url = %request.url, "serving offline fallback");
            return Ok(Served { response: hit, source: ServedFrom::OfflineFallback });
        }

        Err(err)
    }

    /// Static asset: cached copy right away, refreshed in the background.
    pub(crate) async fn cache_first(&self, request: CacheRequest) -> Result<Served, Error> {
        if let Some(hit) = self.lookup_any(&request).await {
            tracing::debug!(url = %request.url, "static cache hit");
            let worker = self.clone();
            self.inner.background.spawn("static-refresh", async move {
                let fresh = worker.inner.network.fetch(&request).await?;
                worker.store(PartitionRole::Static, &request, &fresh).await
            });
            return Ok(Served::cache(hit));
        }

        let response = self.inner.network.fetch(&request).await?;
        if let Err(e) = self.store(PartitionRole::Static, &request, &response).await {
            tracing::warn!(url = %request.url, error = %e, "failed to cache static asset");
        }
        Ok(Served::network(response))
    }

    /// Everything else: cached copy if present, network otherwise; the
    /// partition is refreshed either way.
    ///
    /// A cached entry always wins, even when the network would answer first.
    pub(crate) async fn stale_while_revalidate(&self, request: CacheRequest) -> Result<Served, Error> {
        let partition = match self.inner.partitions.open(PartitionRole::Dynamic).await {
            Ok(partition) => Some(partition),
            Err(e) => {
                tracing::warn!(error = %e, "dynamic partition unavailable");
                None
            }
        };

        let revalidate = {
            let worker = self.clone();
            let request = request.clone();
            tokio::spawn(async move {
                let response = worker.inner.network.fetch(&request).await?;
                if let Err(e) = worker.store(PartitionRole::Dynamic, &request, &response).await {
                    tracing::warn!(url = %request.url, error = %e, "failed to cache response");
                }
                Ok::<CachedResponse, Error>(response)
            })
        };

        let cached = match &partition {
            Some(partition) => self.lookup_in(partition, &request).await,
            None => None,
        };

        if let Some(hit) = cached {
            tracing::debug!(url = %request.url, "serving stale entry");
            self.inner.background.track("revalidate", revalidate);
            return Ok(Served::cache(hit));
        }

        let response = revalidate.await.map_err(|e| Error::TaskFailed(e.to_string()))??;
        Ok(Served::network(response))
    }
}
