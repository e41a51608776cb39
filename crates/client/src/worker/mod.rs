//! The offline cache worker.
//!
//! [`OfflineWorker`] receives the four lifecycle events of a service worker
//! (`install`, `activate`, `fetch`, `sync`) and answers each one with a task
//! handle the host awaits before treating the event as handled. Work that must
//! not hold up the response (cache writes after a network hit, background
//! refreshes, secondary precaching) runs as detached tasks in
//! [`BackgroundTasks`], which logs their failures instead of surfacing them.
//!
//! Strategy per request category:
//!
//! | category      | strategy                                     | writes to |
//! |---------------|----------------------------------------------|-----------|
//! | `Navigation`  | network first, cache then root on failure    | dynamic   |
//! | `StaticAsset` | cache first, refresh in the background       | static    |
//! | `Default`     | stale-while-revalidate                       | dynamic   |
//! | `Ignored`     | not intercepted                              | nothing   |

mod background;
mod lifecycle;
mod manifest;
mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use harbor_core::{AppConfig, CacheDb, CacheRequest, CachedResponse, Category, Classifier, Error, Partitions};

use crate::fetch::Network;

pub use background::BackgroundTasks;
pub use lifecycle::{ActivateReport, InstallReport};
pub use manifest::AssetManifest;
pub use sync::{SAVED_TOOLS_SYNC_TAG, SavedToolsSync, SyncHandler, SyncRegistry};

/// Handle for one event's work. The host awaits it to finish the event.
pub type EventTask<T> = JoinHandle<Result<T, Error>>;

/// Lifecycle state of the worker, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the host should retry with a fresh worker.
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Where a response delivered to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    Network,
    Cache,
    /// The root document, served for a failed navigation.
    OfflineFallback,
}

/// A response delivered to the page.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: CachedResponse,
    pub source: ServedFrom,
}

impl Served {
    fn network(response: CachedResponse) -> Self {
        Self { response, source: ServedFrom::Network }
    }

    fn cache(response: CachedResponse) -> Self {
        Self { response, source: ServedFrom::Cache }
    }
}

/// Outcome of a fetch event.
#[derive(Debug)]
pub enum FetchDecision {
    /// Not intercepted; the host performs the request itself.
    Passthrough,
    /// Intercepted; await the handle for the response.
    Respond(EventTask<Served>),
}

struct Inner {
    manifest: AssetManifest,
    classifier: Classifier,
    partitions: Partitions,
    network: Arc<dyn Network>,
    sync: SyncRegistry,
    background: BackgroundTasks,
    dynamic_max_entries: Option<usize>,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

/// Offline cache manager. Clones share the same state.
#[derive(Clone)]
pub struct OfflineWorker {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("state", &self.state())
            .field("names", self.inner.partitions.cache_names())
            .finish_non_exhaustive()
    }
}

impl OfflineWorker {
    /// Build a worker with the default sync registry.
    pub fn new(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        Self::with_sync_registry(config, db, network, SyncRegistry::default())
    }

    pub fn with_sync_registry(
        config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, sync: SyncRegistry,
    ) -> Result<Self, Error> {
        let manifest = AssetManifest::from_config(config)?;
        let classifier = Classifier::from_config(config)?;
        let partitions = Partitions::new(db, config.cache_names());

        Ok(Self {
            inner: Arc::new(Inner {
                manifest,
                classifier,
                partitions,
                network,
                sync,
                background: BackgroundTasks::default(),
                dynamic_max_entries: config.dynamic_max_entries,
                state: watch::Sender::new(WorkerState::Parsed),
                skip_waiting: AtomicBool::new(false),
                clients_claimed: AtomicBool::new(false),
            }),
        })
    }

    pub fn state(&self) -> WorkerState {
        *self.inner.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.inner.state.subscribe()
    }

    fn set_state(&self, state: WorkerState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            tracing::info!(from = %previous, to = %state, "worker state changed");
        }
    }

    /// Whether install asked the host to activate without waiting for old clients.
    pub fn skip_waiting_requested(&self) -> bool {
        self.inner.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether activation claimed the open clients.
    pub fn clients_claimed(&self) -> bool {
        self.inner.clients_claimed.load(Ordering::SeqCst)
    }

    pub fn partitions(&self) -> &Partitions {
        &self.inner.partitions
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.inner.manifest
    }

    pub fn sync_registry(&self) -> &SyncRegistry {
        &self.inner.sync
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.inner.background
    }

    /// Wait for every detached task started so far.
    pub async fn settle(&self) {
        self.inner.background.settle().await;
    }

    pub fn classify(&self, request: &CacheRequest) -> Category {
        self.inner.classifier.classify(request)
    }

    /// Serve a request with the strategy of its category.
    ///
    /// `Ignored` requests go straight to the network and are never cached;
    /// hosts that honour [`FetchDecision::Passthrough`] never call this for them.
    pub async fn respond(&self, request: CacheRequest, category: Category) -> Result<Served, Error> {
        tracing::debug!(url = %request.url, %category, "serving request");
        match category {
            Category::Navigation => self.network_first(request).await,
            Category::StaticAsset => self.cache_first(request).await,
            Category::Default => self.stale_while_revalidate(request).await,
            Category::Ignored => self.inner.network.fetch(&request).await.map(Served::network),
        }
    }

    pub fn on_install(&self) -> EventTask<InstallReport> {
        let worker = self.clone();
        tokio::spawn(async move { worker.install().await })
    }

    pub fn on_activate(&self) -> EventTask<ActivateReport> {
        let worker = self.clone();
        tokio::spawn(async move { worker.activate().await })
    }

    pub fn on_fetch(&self, request: CacheRequest) -> FetchDecision {
        let category = self.classify(&request);
        if category == Category::Ignored {
            tracing::debug!(url = %request.url, method = %request.method, "not intercepted");
            return FetchDecision::Passthrough;
        }

        let worker = self.clone();
        FetchDecision::Respond(tokio::spawn(async move { worker.respond(request, category).await }))
    }

    /// Run the handler registered for a sync tag. `false` if none is registered.
    pub async fn sync(&self, tag: &str) -> Result<bool, Error> {
        self.inner.sync.dispatch(tag).await
    }

    pub fn on_sync(&self, tag: impl Into<String>) -> EventTask<bool> {
        let worker = self.clone();
        let tag = tag.into();
        tokio::spawn(async move { worker.sync(&tag).await })
    }
}
