//! Scripted network and worker setup shared by the worker tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use harbor_core::{AppConfig, CacheDb, CacheRequest, CachedResponse, Error};

use super::OfflineWorker;
use crate::fetch::Network;

#[derive(Clone)]
enum Route {
    Respond(CachedResponse),
    Fail,
    TimeOut,
    Reject,
}

/// In-memory network answering from a fixed route table.
///
/// While the gate is closed every fetch blocks until it opens.
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
    gate: watch::Sender<bool>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            gate: watch::Sender::new(true),
        })
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: &str) {
        let response = CachedResponse::new(
            url,
            status,
            vec![("content-type".into(), "text/plain".into())],
            body.as_bytes().to_vec(),
        );
        self.routes.lock().unwrap().insert(url.to_string(), Route::Respond(response));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
    }

    pub(crate) fn time_out(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::TimeOut);
    }

    /// Fail the way an unsendable request does, before any I/O.
    pub(crate) fn reject(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Reject);
    }

    pub(crate) fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error> {
        let url = request.url.to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open).await.map_err(|e| Error::Network(e.to_string()))?;

        let route = self.routes.lock().unwrap().get(&url).cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail) => Err(Error::Network(format!("{url}: connection refused"))),
            Some(Route::TimeOut) => Err(Error::FetchTimeout(format!("{url}: timed out"))),
            Some(Route::Reject) => Err(Error::InvalidInput(format!("{url}: invalid request"))),
            None => Err(Error::Network(format!("{url}: no route"))),
        }
    }
}

/// Worker configuration for `https://tools.example.com` with unprefixed partitions.
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        origin: "https://tools.example.com".into(),
        cache_prefix: String::new(),
        cache_version: "v2".into(),
        legacy_version: "v0".into(),
        critical_assets: vec!["/".into(), "/index.html".into()],
        secondary_assets: vec!["/icon.png".into()],
        root_fallback: "/".into(),
        ..Default::default()
    }
}

pub(crate) async fn worker_with(network: Arc<ScriptedNetwork>, config: AppConfig) -> OfflineWorker {
    let db = CacheDb::open_in_memory().await.unwrap();
    OfflineWorker::new(&config, db, network).unwrap()
}
