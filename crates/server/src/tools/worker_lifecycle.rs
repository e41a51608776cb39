//! worker_lifecycle tool implementation.
//!
//! Re-runs install and activate, as a new deployment would.

use harbor_client::OfflineWorker;
use harbor_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the worker_lifecycle tool. Takes none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerLifecycleParams {}

/// Output from the worker_lifecycle tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerLifecycleOutput {
    /// Lifecycle state after activation.
    pub state: String,
    /// Partition the critical assets were written to.
    pub partition: String,
    /// Number of critical assets stored.
    pub critical_cached: usize,
    /// Number of secondary assets fetched in the background.
    pub secondary_scheduled: usize,
    /// Partitions deleted during activation.
    pub deleted: Vec<String>,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

/// Implementation of the worker_lifecycle tool.
///
/// An install failure is returned as an error and activation is skipped.
pub async fn lifecycle_impl(worker: &OfflineWorker, _params: WorkerLifecycleParams) -> Result<CallToolResult, McpError> {
    let install = worker.install().await?;
    let activate = worker.activate().await?;

    let output = WorkerLifecycleOutput {
        state: worker.state().to_string(),
        partition: install.partition,
        critical_cached: install.critical_cached,
        secondary_scheduled: install.secondary_scheduled,
        deleted: activate.deleted,
        skip_waiting: worker.skip_waiting_requested(),
        clients_claimed: worker.clients_claimed(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize lifecycle report: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
