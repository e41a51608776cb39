//! Fixed-route network and worker setup for tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use harbor_client::{Network, OfflineWorker};
use harbor_core::{AppConfig, CacheDb, CacheRequest, CachedResponse, Error};

#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, CachedResponse>>,
    offline: Mutex<bool>,
}

impl StubNetwork {
    pub(crate) fn site() -> Arc<Self> {
        let network = Arc::new(Self::default());
        network.respond("https://tools.example.com/", "text/html", "<html>home</html>");
        network.respond("https://tools.example.com/index.html", "text/html", "<html>index</html>");
        network
    }

    pub(crate) fn respond(&self, url: &str, content_type: &str, body: &str) {
        let response = CachedResponse::new(
            url,
            200,
            vec![("content-type".into(), content_type.into())],
            body.as_bytes().to_vec(),
        );
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn go_offline(&self) {
        *self.offline.lock().unwrap() = true;
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error> {
        if *self.offline.lock().unwrap() {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }
        self.routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("{}: no route", request.url)))
    }
}

pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        origin: "https://tools.example.com".into(),
        critical_assets: vec!["/".into(), "/index.html".into()],
        secondary_assets: Vec::new(),
        ..Default::default()
    }
}

pub(crate) async fn worker(network: Arc<StubNetwork>) -> OfflineWorker {
    let db = CacheDb::open_in_memory().await.unwrap();
    OfflineWorker::new(&test_config(), db, network).unwrap()
}

/// Decode the JSON text of a tool result's first content item.
pub(crate) fn result_json<T: serde::de::DeserializeOwned>(result: &rmcp::model::CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
