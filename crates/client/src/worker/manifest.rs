//! Install-time asset manifest, resolved against the origin.

use url::Url;

use harbor_core::{AppConfig, Error};

use crate::fetch::resolve_asset;

/// Absolute URLs of everything the worker precaches, plus the root fallback.
#[derive(Debug, Clone)]
pub struct AssetManifest {
    pub critical: Vec<Url>,
    pub secondary: Vec<Url>,
    pub root: Url,
}

impl AssetManifest {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve = |path: &String| {
            resolve_asset(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
        };

        Ok(Self {
            critical: config.critical_assets.iter().map(resolve).collect::<Result<_, _>>()?,
            secondary: config.secondary_assets.iter().map(resolve).collect::<Result<_, _>>()?,
            root: resolve(&config.root_fallback)?,
        })
    }
}
