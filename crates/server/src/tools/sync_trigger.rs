//! sync_trigger tool implementation.
//!
//! Delivers a sync event, as the host would once connectivity returns.

use harbor_client::OfflineWorker;
use harbor_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the sync_trigger tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncTriggerParams {
    /// Sync tag, e.g. "sync-saved-tools".
    pub tag: String,
}

/// Output from the sync_trigger tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncTriggerOutput {
    pub tag: String,
    /// Whether a handler was registered for the tag.
    pub handled: bool,
    /// Every registered tag.
    pub registered: Vec<String>,
}

/// Implementation of the sync_trigger tool.
pub async fn trigger_impl(worker: &OfflineWorker, params: SyncTriggerParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.trim();
    if tag.is_empty() {
        return Err(Error::InvalidInput("tag cannot be empty".into()).into());
    }

    let handled = worker
        .on_sync(tag)
        .await
        .map_err(|e| Error::TaskFailed(e.to_string()))??;

    let output =
        SyncTriggerOutput { tag: tag.to_string(), handled, registered: worker.sync_registry().tags() };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize sync result: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
