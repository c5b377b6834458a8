//! Configuration for the Flickr service
//!
//! Configuration is an explicit value handed to the service and gateway at
//! construction time. It can be built in code or loaded from a YAML file:
//!
//! ```yaml
//! api_key: "0123456789abcdef"
//! soft_cache_expiry_seconds: 3600
//! hard_cache_expiry_seconds: 86400
//! skip_error_logging: false
//! request_timeout_seconds: 30
//! ```
//!
//! Every field has a default, so a file only needs the keys it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default soft cache expiry (1 hour): how long a cached response is
/// served without attempting a fresh API call.
pub const DEFAULT_SOFT_CACHE_EXPIRY_SECS: u64 = 3600;

/// Default hard cache expiry (1 day): how long the store keeps an entry
/// before clearing it outright. Photosets removed from Flickr stop
/// appearing once this elapses.
pub const DEFAULT_HARD_CACHE_EXPIRY_SECS: u64 = 86_400;

/// Public REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.flickr.com/services/rest/";

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing failed
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Settings consumed by the gateway and the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickrConfig {
    /// API key sent with every request
    pub api_key: String,
    /// REST endpoint to query
    pub endpoint: String,
    /// Age under which a cached entry is served without a live call
    pub soft_cache_expiry_seconds: u64,
    /// Age at which the store discards an entry unconditionally
    pub hard_cache_expiry_seconds: u64,
    /// Suppress error logging in the plain query operations
    pub skip_error_logging: bool,
    /// Transport-level request timeout; absent means no timeout
    pub request_timeout_seconds: Option<u64>,
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            soft_cache_expiry_seconds: DEFAULT_SOFT_CACHE_EXPIRY_SECS,
            hard_cache_expiry_seconds: DEFAULT_HARD_CACHE_EXPIRY_SECS,
            skip_error_logging: false,
            request_timeout_seconds: None,
        }
    }
}

impl FlickrConfig {
    /// Create a configuration with default expiry settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Soft cache expiry as a `Duration`
    pub fn soft_cache_expiry(&self) -> Duration {
        Duration::from_secs(self.soft_cache_expiry_seconds)
    }

    /// Hard cache expiry as a `Duration`
    pub fn hard_cache_expiry(&self) -> Duration {
        Duration::from_secs(self.hard_cache_expiry_seconds)
    }

    /// Request timeout as a `Duration`, when one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}
