//! Configuration management for wikinow
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with WIKINOW__)
//! - Configuration files (wikinow.toml, wikinow.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WikinowConfig {
    /// MediaWiki link-graph API configuration
    #[serde(default)]
    pub linkgraph: LinkGraphConfig,

    /// Wikimedia REST pageviews API configuration
    #[serde(default)]
    pub pageviews: PageviewsConfig,

    /// Wikishark historical pageviews configuration
    #[serde(default)]
    pub wikishark: WikisharkConfig,

    /// Courtesy pacing configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkGraphConfig {
    /// Override for the API endpoint; `{lang}` is replaced with the
    /// query language (defaults to the public Wikipedia API)
    #[serde(default = "default_linkgraph_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageviewsConfig {
    /// Base URL of the Wikimedia REST v1 API
    #[serde(default = "default_pageviews_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WikisharkConfig {
    /// Base URL of the Wikishark site
    #[serde(default = "default_wikishark_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second against a single remote service
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable courtesy pacing
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_linkgraph_base() -> String {
    "https://{lang}.wikipedia.org/w/api.php".to_string()
}
fn default_pageviews_base() -> String {
    "https://wikimedia.org/api/rest_v1".to_string()
}
fn default_wikishark_base() -> String {
    "http://www.wikishark.com".to_string()
}
fn default_http_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("wikinow/{}", env!("CARGO_PKG_VERSION"))
}
fn default_rate_limit() -> u32 {
    1
}
fn default_burst() -> u32 {
    1
}
fn default_enabled() -> bool {
    true
}

impl Default for LinkGraphConfig {
    fn default() -> Self {
        Self {
            api_base: default_linkgraph_base(),
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PageviewsConfig {
    fn default() -> Self {
        Self {
            api_base: default_pageviews_base(),
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for WikisharkConfig {
    fn default() -> Self {
        Self {
            api_base: default_wikishark_base(),
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl WikinowConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("wikinow").required(false))
            // Load local overrides
            .add_source(File::with_name("wikinow.local").required(false))
            // Load from environment variables with WIKINOW__ prefix
            // e.g., WIKINOW__RATE_LIMIT__ENABLED=false
            .add_source(
                Environment::with_prefix("WIKINOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("WIKINOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the link-graph request timeout as Duration
    pub fn linkgraph_timeout(&self) -> Duration {
        Duration::from_secs(self.linkgraph.timeout_secs)
    }

    /// Get the pageviews request timeout as Duration
    pub fn pageviews_timeout(&self) -> Duration {
        Duration::from_secs(self.pageviews.timeout_secs)
    }

    /// Get the Wikishark request timeout as Duration
    pub fn wikishark_timeout(&self) -> Duration {
        Duration::from_secs(self.wikishark.timeout_secs)
    }
}

impl Default for WikinowConfig {
    fn default() -> Self {
        Self {
            linkgraph: LinkGraphConfig::default(),
            pageviews: PageviewsConfig::default(),
            wikishark: WikisharkConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WikinowConfig::default();
        assert_eq!(config.linkgraph.api_base, "https://{lang}.wikipedia.org/w/api.php");
        assert_eq!(config.pageviews.api_base, "https://wikimedia.org/api/rest_v1");
        assert_eq!(config.rate_limit.requests_per_second, 1);
        assert!(config.rate_limit.enabled);
    }

    #[test]
    fn test_deserialize_without_any_source_uses_defaults() {
        // No file, no env override: every section has to materialize
        // from its defaults
        let empty = Config::builder().build().unwrap();
        let config: WikinowConfig = empty.try_deserialize().unwrap();

        assert_eq!(config.linkgraph.api_base, default_linkgraph_base());
        assert_eq!(config.pageviews.api_base, default_pageviews_base());
        assert_eq!(config.wikishark.api_base, default_wikishark_base());
        assert_eq!(config.rate_limit.requests_per_second, default_rate_limit());
    }

    #[test]
    fn test_load_without_config_file() {
        // The working directory carries no wikinow.toml, so this is the
        // CLI's default startup path
        let config = WikinowConfig::load().unwrap();
        assert_eq!(config.linkgraph.timeout_secs, default_http_timeout());
    }

    #[test]
    fn test_timeout_helpers() {
        let config = WikinowConfig::default();
        assert_eq!(config.linkgraph_timeout(), Duration::from_secs(30));
        assert_eq!(config.wikishark_timeout(), Duration::from_secs(30));
    }
}
