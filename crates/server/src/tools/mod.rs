//! MCP tool implementations.
//!
//! This module contains all tools exposed by the harbor server. Every tool
//! drives the shared [`harbor_client::OfflineWorker`].

pub mod cache;
pub mod offline_fetch;
pub mod sync_trigger;
pub mod worker_lifecycle;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheListParams, list_impl};
pub use offline_fetch::{OfflineFetchParams, fetch_impl};
pub use sync_trigger::{SyncTriggerParams, trigger_impl};
pub use worker_lifecycle::{WorkerLifecycleParams, lifecycle_impl};
