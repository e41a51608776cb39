//! Deferred sync hooks.
//!
//! A sync event carries a tag; the registry maps tags to handlers. The only
//! tag registered by default is [`SAVED_TOOLS_SYNC_TAG`], whose handler is a
//! placeholder until saved tools are queued offline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use harbor_core::Error;

/// Tag the page registers when saved tools change while offline.
pub const SAVED_TOOLS_SYNC_TAG: &str = "sync-saved-tools";

#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn run(&self, tag: &str) -> Result<(), Error>;
}

/// Handler for [`SAVED_TOOLS_SYNC_TAG`]. Completes without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SavedToolsSync;

#[async_trait]
impl SyncHandler for SavedToolsSync {
    async fn run(&self, tag: &str) -> Result<(), Error> {
        tracing::info!(tag, "syncing saved tools");
        Ok(())
    }
}

/// Tag to handler mapping.
#[derive(Clone)]
pub struct SyncRegistry {
    handlers: HashMap<String, Arc<dyn SyncHandler>>,
}

impl SyncRegistry {
    /// Registry with no handlers.
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Register a handler, returning the one it replaces.
    pub fn register(&mut self, tag: impl Into<String>, handler: Arc<dyn SyncHandler>) -> Option<Arc<dyn SyncHandler>> {
        self.handlers.insert(tag.into(), handler)
    }

    pub fn has(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.handlers.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Run the handler for `tag`.
    ///
    /// Returns `Ok(false)` when no handler is registered; the event then
    /// completes without effect.
    pub async fn dispatch(&self, tag: &str) -> Result<bool, Error> {
        let Some(handler) = self.handlers.get(tag) else {
            tracing::debug!(tag, "no handler for sync tag");
            return Ok(false);
        };

        handler.run(tag).await?;
        tracing::debug!(tag, "sync completed");
        Ok(true)
    }
}

impl Default for SyncRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(SAVED_TOOLS_SYNC_TAG, Arc::new(SavedToolsSync));
        registry
    }
}

impl std::fmt::Debug for SyncRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRegistry").field("tags", &self.tags()).finish()
    }
}
