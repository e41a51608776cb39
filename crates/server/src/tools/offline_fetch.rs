//! offline_fetch tool implementation.
//!
//! Sends one request through the worker, exactly as a page fetch would be
//! intercepted, and reports where the response came from.

use harbor_client::{FetchDecision, OfflineWorker, ServedFrom, canonicalize};
use harbor_core::{CacheRequest, Category, Error, RequestMode};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// The URL to request.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET is passed through.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a page navigation.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    /// The canonical URL that was requested.
    pub url: String,
    /// Request category: ignored, navigation, static_asset or default.
    pub category: String,
    /// Where the response came from: network, cache, offline_fallback or passthrough.
    pub source: String,
    /// HTTP status of the delivered response.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// When the entry was written, for responses served from a partition.
    pub stored_at: Option<String>,
    /// Body size in bytes.
    pub body_bytes: usize,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

fn source_label(source: ServedFrom) -> &'static str {
    match source {
        ServedFrom::Network => "network",
        ServedFrom::Cache => "cache",
        ServedFrom::OfflineFallback => "offline_fallback",
    }
}

fn parse_request(params: &OfflineFetchParams) -> Result<CacheRequest, Error> {
    let method = params.method.trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidInput(format!("invalid method: {:?}", params.method)));
    }

    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::default() };

    Ok(CacheRequest::new(url, method, mode))
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(worker: &OfflineWorker, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    let request = parse_request(&params)?;
    let url = request.url.to_string();
    let category = worker.classify(&request);

    let (response, source) = match worker.on_fetch(request.clone()) {
        FetchDecision::Passthrough => {
            let served = worker.respond(request, Category::Ignored).await?;
            (served.response, "passthrough")
        }
        FetchDecision::Respond(handle) => {
            let served = handle.await.map_err(|e| Error::TaskFailed(e.to_string()))??;
            (served.response, source_label(served.source))
        }
    };

    tracing::debug!(%url, %category, source, status = response.status, "offline_fetch served");

    let output = OfflineFetchOutput {
        url,
        category: category.to_string(),
        source: source.into(),
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        stored_at: response.stored_at.clone(),
        body_bytes: response.body.len(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
