//! Configuration validation rules.
//!
//! Runs after `AppConfig` has been loaded from environment, files, or
//! defaults.

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
    /// Returns `ConfigError` if:
    /// - `generation` is empty or contains whitespace
    /// - `cache_prefix` is empty
    /// - `origin` is not an http(s) URL
    /// - `precache` is empty, or a path resolves outside the origin
    /// - `offline_fallback` resolves outside the origin
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.is_empty() {
            return Err(ConfigError::Missing {
                field: "generation".into(),
                hint: "Set OBX_GENERATION to the deployment's version tag".into(),
            });
        }
        if self.generation.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid { field: "generation".into(), reason: "must not contain whitespace".into() });
        }

        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }

        let origin = self.origin_url()?;

        if self.precache.is_empty() {
            return Err(ConfigError::Invalid { field: "precache".into(), reason: "must list at least one path".into() });
        }
        let precache = self.precache_urls()?;
        if let Some(foreign) = precache.iter().find(|u| !crate::url::same_origin(u, &origin)) {
            return Err(ConfigError::Invalid {
                field: "precache".into(),
                reason: format!("{foreign} is not on origin {}", origin.origin().ascii_serialization()),
            });
        }

        let fallback = self.offline_fallback_url()?;
        if !crate::url::same_origin(&fallback, &origin) {
            return Err(ConfigError::Invalid {
                field: "offline_fallback".into(),
                reason: format!("{fallback} is not on origin {}", origin.origin().ascii_serialization()),
            });
        }
        if !precache.contains(&fallback) {
            tracing::warn!(
                offline_fallback = %fallback,
                "offline_fallback is not in the precache list; offline navigations \
                 without a cached entry will fail"
            );
        }

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

        Ok(())
    }
}
