//! Configuration for the tradedesk clients
//!
//! Values come from three layers, later layers winning: built-in defaults,
//! an optional JSON file, and `DESK_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable overriding [`DeskConfig::api_base_url`]
pub const ENV_API_BASE_URL: &str = "DESK_API_BASE_URL";
/// Environment variable overriding [`DeskConfig::catalog_base_url`]
pub const ENV_CATALOG_BASE_URL: &str = "DESK_CATALOG_BASE_URL";
/// Environment variable overriding [`DeskConfig::default_user_id`]
pub const ENV_USER_ID: &str = "DESK_USER_ID";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the backend and market-data clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Base URL of the dashboard backend (chat, news, planner)
    pub api_base_url: String,

    /// Base URL of the CoinGecko v3 API
    pub catalog_base_url: String,

    /// Quote currency for price series
    pub vs_currency: String,

    /// Catalog requests allowed per minute
    pub catalog_rate_limit: u32,

    /// Request timeout for plain request/response calls, in seconds
    pub request_timeout_secs: u64,

    /// Default planner step budget
    pub plan_max_steps: u32,

    /// Default planner confidence threshold
    pub plan_stop_score: f64,

    /// User id sent with plan requests when none is given
    pub default_user_id: String,

    /// Number of news documents kept for chat grounding
    pub news_top_k: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            catalog_base_url: "https://api.coingecko.com/api/v3".to_string(),
            vs_currency: "usd".to_string(),
            catalog_rate_limit: 30,
            request_timeout_secs: 30,
            plan_max_steps: 4,
            plan_stop_score: 0.55,
            default_user_id: "U01".to_string(),
            news_top_k: 3,
        }
    }
}

impl DeskConfig {
    /// Create a new configuration builder
    pub fn builder() -> DeskConfigBuilder {
        DeskConfigBuilder::default()
    }

    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DESK_*` environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Ok(url) = std::env::var(ENV_CATALOG_BASE_URL) {
            self.catalog_base_url = url;
        }
        if let Ok(user) = std::env::var(ENV_USER_ID) {
            self.default_user_id = user;
        }
        self
    }

    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backend base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Catalog base URL without a trailing slash
    pub fn catalog_base(&self) -> &str {
        self.catalog_base_url.trim_end_matches('/')
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("api_base_url", &self.api_base_url),
            ("catalog_base_url", &self.catalog_base_url),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{name} '{value}': {e}")))?;
        }

        if self.vs_currency.trim().is_empty() {
            return Err(ConfigError::Invalid("vs_currency must not be empty".to_string()));
        }

        if self.catalog_rate_limit == 0 {
            return Err(ConfigError::Invalid(
                "catalog_rate_limit must be greater than 0".to_string(),
            ));
        }

        if self.plan_max_steps == 0 {
            return Err(ConfigError::Invalid(
                "plan_max_steps must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.plan_stop_score) {
            return Err(ConfigError::Invalid(format!(
                "plan_stop_score must be within [0, 1], got {}",
                self.plan_stop_score
            )));
        }

        if self.news_top_k == 0 {
            return Err(ConfigError::Invalid("news_top_k must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Builder for DeskConfig
#[derive(Debug, Default)]
pub struct DeskConfigBuilder {
    api_base_url: Option<String>,
    catalog_base_url: Option<String>,
    vs_currency: Option<String>,
    catalog_rate_limit: Option<u32>,
    request_timeout_secs: Option<u64>,
    plan_max_steps: Option<u32>,
    plan_stop_score: Option<f64>,
    default_user_id: Option<String>,
    news_top_k: Option<usize>,
}

impl DeskConfigBuilder {
    /// Set the backend base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the catalog base URL
    pub fn catalog_base_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_base_url = Some(url.into());
        self
    }

    /// Set the quote currency
    pub fn vs_currency(mut self, currency: impl Into<String>) -> Self {
        self.vs_currency = Some(currency.into());
        self
    }

    /// Set catalog requests per minute
    pub fn catalog_rate_limit(mut self, per_minute: u32) -> Self {
        self.catalog_rate_limit = Some(per_minute);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Set the default planner step budget
    pub fn plan_max_steps(mut self, steps: u32) -> Self {
        self.plan_max_steps = Some(steps);
        self
    }

    /// Set the default planner stop score
    pub fn plan_stop_score(mut self, score: f64) -> Self {
        self.plan_stop_score = Some(score);
        self
    }

    /// Set the default user id
    pub fn default_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.default_user_id = Some(user_id.into());
        self
    }

    /// Set how many news documents are kept
    pub fn news_top_k(mut self, top_k: usize) -> Self {
        self.news_top_k = Some(top_k);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DeskConfig, ConfigError> {
        let defaults = DeskConfig::default();

        let config = DeskConfig {
            api_base_url: self.api_base_url.unwrap_or(defaults.api_base_url),
            catalog_base_url: self.catalog_base_url.unwrap_or(defaults.catalog_base_url),
            vs_currency: self.vs_currency.unwrap_or(defaults.vs_currency),
            catalog_rate_limit: self.catalog_rate_limit.unwrap_or(defaults.catalog_rate_limit),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            plan_max_steps: self.plan_max_steps.unwrap_or(defaults.plan_max_steps),
            plan_stop_score: self.plan_stop_score.unwrap_or(defaults.plan_stop_score),
            default_user_id: self.default_user_id.unwrap_or(defaults.default_user_id),
            news_top_k: self.news_top_k.unwrap_or(defaults.news_top_k),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeskConfig::default();
        assert_eq!(config.api_base(), "http://127.0.0.1:8000");
        assert_eq!(config.plan_max_steps, 4);
        assert!((config.plan_stop_score - 0.55).abs() < f64::EPSILON);
        assert_eq!(config.news_top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DeskConfig::builder()
            .api_base_url("http://localhost:9000/")
            .plan_max_steps(6)
            .request_timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.api_base(), "http://localhost:9000");
        assert_eq!(config.plan_max_steps, 6);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(DeskConfig::builder().api_base_url("not a url").build().is_err());
        assert!(DeskConfig::builder().catalog_rate_limit(0).build().is_err());
        assert!(DeskConfig::builder().plan_stop_score(1.5).build().is_err());
        assert!(DeskConfig::builder().news_top_k(0).build().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DeskConfig =
            serde_json::from_str(r#"{"api_base_url": "http://10.0.0.2:8000"}"#).unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.2:8000");
        assert_eq!(config.vs_currency, "usd");
        assert_eq!(config.default_user_id, "U01");
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("desk-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"plan_max_steps": 2, "news_top_k": 5}"#).unwrap();

        let config = DeskConfig::from_file(&path).unwrap();
        assert_eq!(config.plan_max_steps, 2);
        assert_eq!(config.news_top_k, 5);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_from_missing_file() {
        let err = DeskConfig::from_file("/nonexistent/desk.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
