//! Request classification.
//!
//! Every intercepted request maps to exactly one [`Category`]. Rules are
//! checked in order and the first match wins:
//!
//! 1. `Ignored`: dev-server live-reload traffic, any non-GET method, or an
//!    API/backend URL. These are never intercepted.
//! 2. `Navigation`: the request is a document navigation.
//! 3. `StaticAsset`: the URL path ends with a static-resource extension.
//! 4. `Default`: everything else.
//!
//! Classification does no I/O and keeps no state.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::config::AppConfig;
use crate::request::{CacheRequest, RequestMode};

/// Strategy selector for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ignored,
    Navigation,
    StaticAsset,
    Default,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Ignored => write!(f, "ignored"),
            Category::Navigation => write!(f, "navigation"),
            Category::StaticAsset => write!(f, "static_asset"),
            Category::Default => write!(f, "default"),
        }
    }
}

/// Request classifier built from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    dev_markers: Vec<String>,
    api_markers: Vec<String>,
    static_ext: Option<Regex>,
}

impl Classifier {
    /// Build a classifier from marker lists and bare extensions (`"js"`, `".css"`).
    pub fn new(dev_markers: Vec<String>, api_markers: Vec<String>, extensions: &[String]) -> Result<Self, Error> {
        let alternatives: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(regex::escape)
            .collect();

        let static_ext = if alternatives.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\.(?:{})$", alternatives.join("|"));
            Some(Regex::new(&pattern).map_err(|e| Error::InvalidInput(format!("static extensions: {e}")))?)
        };

        Ok(Self { dev_markers, api_markers, static_ext })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(config.dev_markers.clone(), config.api_markers.clone(), &config.static_extensions)
    }

    pub fn classify(&self, request: &CacheRequest) -> Category {
        let url = request.url.as_str();

        if self.dev_markers.iter().any(|m| url.contains(m.as_str()))
            || !request.is_get()
            || self.api_markers.iter().any(|m| url.contains(m.as_str()))
        {
            return Category::Ignored;
        }

        if request.mode == RequestMode::Navigate {
            return Category::Navigation;
        }

        if let Some(re) = &self.static_ext
            && re.is_match(request.url.path())
        {
            return Category::StaticAsset;
        }

        Category::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn classifier() -> Classifier {
        Classifier::from_config(&AppConfig::default()).unwrap()
    }

    fn req(url: &str, method: &str, mode: RequestMode) -> CacheRequest {
        CacheRequest::new(Url::parse(url).unwrap(), method, mode)
    }

    #[test]
    fn test_navigation() {
        let c = classifier();
        let r = req("https://tools.example.com/tools/chatgpt", "GET", RequestMode::Navigate);
        assert_eq!(c.classify(&r), Category::Navigation);
    }

    #[test]
    fn test_static_extensions() {
        let c = classifier();
        for path in ["/assets/index-4f2a.js", "/assets/app.CSS", "/logo.svg", "/fonts/inter.woff2", "/favicon.ico"] {
            let r = req(&format!("https://tools.example.com{path}"), "GET", RequestMode::NoCors);
            assert_eq!(c.classify(&r), Category::StaticAsset, "{path}");
        }
    }

    #[test]
    fn test_query_string_does_not_hide_extension() {
        let c = classifier();
        let r = req("https://tools.example.com/assets/app.js?v=3", "GET", RequestMode::NoCors);
        assert_eq!(c.classify(&r), Category::StaticAsset);
    }

    #[test]
    fn test_extension_must_be_suffix() {
        let c = classifier();
        let r = req("https://tools.example.com/blog/why-js-matters", "GET", RequestMode::Cors);
        assert_eq!(c.classify(&r), Category::Default);
    }

    #[test]
    fn test_default() {
        let c = classifier();
        let r = req("https://tools.example.com/data/tools.json", "GET", RequestMode::Cors);
        assert_eq!(c.classify(&r), Category::Default);
    }

    #[test]
    fn test_non_get_beats_static_extension() {
        let c = classifier();
        let r = req("https://tools.example.com/assets/app.js", "POST", RequestMode::NoCors);
        assert_eq!(c.classify(&r), Category::Ignored);
    }

    #[test]
    fn test_non_get_beats_navigation() {
        let c = classifier();
        let r = req("https://tools.example.com/submit", "POST", RequestMode::Navigate);
        assert_eq!(c.classify(&r), Category::Ignored);
    }

    #[test]
    fn test_api_and_backend_ignored() {
        let c = classifier();
        let api = req("https://tools.example.com/api/recommend", "GET", RequestMode::Cors);
        let backend = req("https://abcd.supabase.co/rest/v1/tools?select=*", "GET", RequestMode::Cors);
        let backend_nav = req("https://abcd.supabase.co/auth/v1/callback", "GET", RequestMode::Navigate);
        assert_eq!(c.classify(&api), Category::Ignored);
        assert_eq!(c.classify(&backend), Category::Ignored);
        assert_eq!(c.classify(&backend_nav), Category::Ignored);
    }

    #[test]
    fn test_dev_tooling_ignored() {
        let c = classifier();
        let r = req("http://localhost:5173/@vite/client", "GET", RequestMode::NoCors);
        assert_eq!(c.classify(&r), Category::Ignored);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let requests = [
            req("https://tools.example.com/", "GET", RequestMode::Navigate),
            req("https://tools.example.com/a.png", "GET", RequestMode::NoCors),
            req("https://tools.example.com/api/x", "GET", RequestMode::Cors),
            req("https://tools.example.com/feed", "GET", RequestMode::SameOrigin),
        ];
        for r in &requests {
            let first = c.classify(r);
            for _ in 0..10 {
                assert_eq!(c.classify(r), first);
            }
        }
    }

    #[test]
    fn test_no_extensions_disables_static() {
        let c = Classifier::new(Vec::new(), Vec::new(), &[]).unwrap();
        let r = req("https://tools.example.com/a.js", "GET", RequestMode::NoCors);
        assert_eq!(c.classify(&r), Category::Default);
    }

    #[test]
    fn test_extension_is_escaped() {
        let c = Classifier::new(Vec::new(), Vec::new(), &["c++".to_string()]).unwrap();
        let hit = req("https://tools.example.com/main.c++", "GET", RequestMode::NoCors);
        let miss = req("https://tools.example.com/main.cc", "GET", RequestMode::NoCors);
        assert_eq!(c.classify(&hit), Category::StaticAsset);
        assert_eq!(c.classify(&miss), Category::Default);
    }
}
