//! Application configuration with layered loading.
//!
//! Uses figment for layered configuration loading from multiple sources:
//!
//! 1. Environment variables (OBX_*)
//! 2. TOML config file (if OBX_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OBX_*)
/// 2. TOML config file (if OBX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache generation identifier. Must change on every deployment that
    /// should invalidate previously cached content.
    ///
    /// Set via OBX_GENERATION. Defaults to `v<GITHUB_RUN_NUMBER>` captured at
    /// build time, or `vdev` for local builds.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Prefix shared by every store name this agent creates.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Origin and scope of the application, e.g. `http://localhost:8080/`.
    ///
    /// Precache paths resolve against this URL and only requests to its
    /// origin are intercepted.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Paths fetched and stored at install time, in order.
    ///
    /// Set via OBX_PRECACHE as a figment array, e.g. `["./", "./index.html"]`.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Page served to navigations that fail while offline and have no
    /// cached entry of their own.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Path to the SQLite cache storage.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size accepted from the network.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_generation() -> String {
    format!("v{}", option_env!("GITHUB_RUN_NUMBER").unwrap_or("dev"))
}

fn default_cache_prefix() -> String {
    "obx-cache-".into()
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_precache() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./offline.html",
        "./manifest.webmanifest",
        "./icons/icon.svg",
        "./icons/icon-maskable.svg",
        "./logo.svg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_fallback() -> String {
    "./offline.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./obx-cache.sqlite")
}

fn default_user_agent() -> String {
    "obx-offline/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            precache: default_precache(),
            offline_fallback: default_offline_fallback(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin/scope URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        crate::url::canonicalize(&self.origin).map_err(|e| ConfigError::Invalid {
            field: "origin".into(),
            reason: e.to_string(),
        })
    }

    /// Precache paths resolved against the origin, duplicates dropped.
    pub fn precache_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let origin = self.origin_url()?;
        let mut urls: Vec<Url> = Vec::with_capacity(self.precache.len());
        for path in &self.precache {
            let url = crate::url::resolve(&origin, path).map_err(|e| ConfigError::Invalid {
                field: "precache".into(),
                reason: format!("{path}: {e}"),
            })?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }

    /// Offline fallback resolved against the origin.
    pub fn offline_fallback_url(&self) -> Result<Url, ConfigError> {
        let origin = self.origin_url()?;
        crate::url::resolve(&origin, &self.offline_fallback).map_err(|e| ConfigError::Invalid {
            field: "offline_fallback".into(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OBX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OBX_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
