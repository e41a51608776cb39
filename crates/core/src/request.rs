//! Request descriptors and captured response snapshots.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_request_key;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full document load.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub url: Url,
    /// Upper-cased HTTP method.
    pub method: String,
    pub mode: RequestMode,
}

impl CacheRequest {
    /// Build a request, stripping the fragment and upper-casing the method.
    pub fn new(mut url: Url, method: &str, mode: RequestMode) -> Self {
        url.set_fragment(None);
        Self { url, method: method.trim().to_ascii_uppercase(), mode }
    }

    /// A plain sub-resource GET.
    pub fn get(url: Url) -> Self {
        Self::new(url, "GET", RequestMode::Cors)
    }

    /// A document navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(url, "GET", RequestMode::Navigate)
    }

    /// Parse an absolute URL string into a request.
    pub fn parse(url: &str, method: &str, mode: RequestMode) -> Result<Self, Error> {
        let url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }
        Ok(Self::new(url, method, mode))
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Storage key: SHA-256 over method and URL.
    pub fn cache_key(&self) -> String {
        compute_request_key(&self.method, self.url.as_str())
    }
}

/// A captured response: status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 write time, present on responses read back from storage.
    #[serde(default)]
    pub stored_at: Option<String>,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { url: url.into(), status, headers, body, stored_at: None }
    }

    /// Whether the response may be written into a partition.
    ///
    /// Partial content is never stored.
    pub fn is_cacheable(&self) -> bool {
        (200..=299).contains(&self.status) && self.status != 206
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
