//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_version` is empty
    /// - `cache_version` equals `legacy_version` (the legacy partition would be current)
    /// - `origin` is not an http(s) URL
    /// - a static extension is empty or `dynamic_max_entries` is 0
    ///
    /// Returns `ConfigError::Missing` if `critical_assets` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_version.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }
        if self.cache_version == self.legacy_version {
            return Err(ConfigError::Invalid {
                field: "legacy_version".into(),
                reason: "must differ from cache_version".into(),
            });
        }

        self.origin_url()?;

        if self.critical_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "critical_assets".into(),
                hint: "list at least the root document, e.g. [\"/\"]".into(),
            });
        }

        if self.static_extensions.iter().any(|ext| ext.trim_start_matches('.').is_empty()) {
            return Err(ConfigError::Invalid {
                field: "static_extensions".into(),
                reason: "extensions must not be empty".into(),
            });
        }

        if self.dynamic_max_entries == Some(0) {
            return Err(ConfigError::Invalid {
                field: "dynamic_max_entries".into(),
                reason: "must be greater than 0 when set".into(),
            });
        }

        if !self.critical_assets.contains(&self.root_fallback) {
            tracing::warn!(
                root_fallback = %self.root_fallback,
                "root fallback is not a critical asset; offline navigations may fail until it is cached"
            );
        }

        Ok(())
    }
}
