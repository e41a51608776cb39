//! cache_list tool implementation.
//!
//! Lists partitions and the URLs stored in each.

use harbor_client::OfflineWorker;
use harbor_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Only list this partition.
    #[serde(default)]
    pub partition: Option<String>,
}

/// One partition in the listing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionListing {
    pub name: String,
    /// Whether the partition belongs to the running version.
    pub current: bool,
    /// static, dynamic or legacy, when the name is recognised.
    pub role: Option<String>,
    /// Stored URLs, oldest write first.
    pub entries: Vec<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub partitions: Vec<PartitionListing>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &OfflineWorker, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let partitions = worker.partitions();
    let names = partitions.cache_names();

    let selected = match params.partition {
        Some(name) => {
            if !partitions.has(&name).await? {
                return Err(Error::CacheMiss(name).into());
            }
            vec![name]
        }
        None => partitions.names().await?,
    };

    let mut listings = Vec::with_capacity(selected.len());
    for name in selected {
        let entries = partitions.open_named(&name).await?.keys().await?;
        listings.push(PartitionListing {
            current: names.is_current(&name),
            role: names.role_of(&name).map(|r| r.as_str().to_string()),
            name,
            entries,
        });
    }

    let output = CacheListOutput { partitions: listings };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize listing: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
