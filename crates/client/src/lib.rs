//! Client code for harbor.
//!
//! This crate provides the network fetch pipeline and the offline cache
//! worker that routes each request through its caching strategy.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, canonicalize, resolve_asset};
pub use worker::{
    ActivateReport, AssetManifest, BackgroundTasks, EventTask, FetchDecision, InstallReport, OfflineWorker,
    SAVED_TOOLS_SYNC_TAG, SavedToolsSync, Served, ServedFrom, SyncHandler, SyncRegistry, WorkerState,
};
