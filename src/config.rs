//! Client configuration

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Client configuration
///
/// All durations accept humantime strings in config files and environment
/// variables (`"30s"`, `"100ms"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the FarmLink API, e.g. `https://api.farmlink.example`
    pub base_url: String,

    /// Wall-clock watchdog timeout applied to every request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// How long a cached GET response stays eligible for reuse
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Delay before the single token re-fetch when the session provider
    /// reports no token (covers a session that is mid-initialization)
    #[serde(with = "humantime_serde")]
    pub token_retry_delay: Duration,

    /// Enable the GET response cache
    pub cache_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(30),
            token_retry_delay: Duration::from_millis(100),
            cache_enabled: true,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with defaults for the given base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from an optional YAML file, then merge
    /// `FARMLINK_`-prefixed environment variables on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, fails to parse, or the
    /// resulting configuration fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("FARMLINK_"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that serde alone cannot enforce
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is absent or unparseable, or a
    /// timing knob is zero.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("base_url must not be empty".to_string()));
        }
        Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base_url: {e}")))?;
        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        if self.cache_enabled && self.cache_ttl.is_zero() {
            return Err(Error::Config(
                "cache_ttl must be non-zero when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
