//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HARBOR_*)
//! 2. TOML config file (if HARBOR_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is immutable once built. Cache partition names and
//! the activation allow-list are both derived from it through [`AppConfig::cache_names`]
//! so they can never disagree.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HARBOR_*)
/// 2. TOML config file (if HARBOR_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// List values can be given in the TOML file or as TOML arrays in the
/// environment, e.g. `HARBOR_CRITICAL_ASSETS='["/", "/index.html"]'`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via HARBOR_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin every manifest path and the root fallback are resolved against.
    ///
    /// Set via HARBOR_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via HARBOR_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout in milliseconds.
    ///
    /// Set via HARBOR_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    ///
    /// Set via HARBOR_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Prefix shared by every partition name. May be empty.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token of the current deployment.
    ///
    /// Bumping it makes every partition of the previous version stale; they
    /// are deleted on the next activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Version token of the deprecated general-purpose partition.
    #[serde(default = "default_legacy_version")]
    pub legacy_version: String,

    /// Paths that must be cached before install succeeds.
    #[serde(default = "default_critical_assets")]
    pub critical_assets: Vec<String>,

    /// Paths cached best-effort after install.
    #[serde(default = "default_secondary_assets")]
    pub secondary_assets: Vec<String>,

    /// Document served when a navigation fails and has no exact cache match.
    #[serde(default = "default_root_fallback")]
    pub root_fallback: String,

    /// URL substrings identifying dev-server live-reload traffic.
    #[serde(default = "default_dev_markers")]
    pub dev_markers: Vec<String>,

    /// URL substrings identifying API and hosted-backend calls.
    #[serde(default = "default_api_markers")]
    pub api_markers: Vec<String>,

    /// File extensions (without the dot) served cache-first.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Upper bound on entries in the dynamic partition. Unbounded when unset.
    #[serde(default)]
    pub dynamic_max_entries: Option<usize>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./harbor-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_user_agent() -> String {
    "harbor/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_cache_prefix() -> String {
    "ai-tools".into()
}

fn default_cache_version() -> String {
    "v2".into()
}

fn default_legacy_version() -> String {
    "v1".into()
}

fn default_critical_assets() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_secondary_assets() -> Vec<String> {
    vec!["/favicon.ico".into(), "/icons/icon-192x192.png".into(), "/icons/icon-512x512.png".into()]
}

fn default_root_fallback() -> String {
    "/".into()
}

fn default_dev_markers() -> Vec<String> {
    vec!["/@vite/".into(), "/@react-refresh".into(), "__vite_ping".into(), ".hot-update.".into()]
}

fn default_api_markers() -> Vec<String> {
    vec!["/api/".into(), "supabase.co".into()]
}

fn default_static_extensions() -> Vec<String> {
    ["js", "css", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf", "eot"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            legacy_version: default_legacy_version(),
            critical_assets: default_critical_assets(),
            secondary_assets: default_secondary_assets(),
            root_fallback: default_root_fallback(),
            dev_markers: default_dev_markers(),
            api_markers: default_api_markers(),
            static_extensions: default_static_extensions(),
            dynamic_max_entries: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }

    /// Partition names of the current deployment.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, &self.cache_version, &self.legacy_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HARBOR_`
    /// 2. TOML file from `HARBOR_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HARBOR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HARBOR_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
