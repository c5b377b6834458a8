//! Transport gateway for the Flickr REST API
//!
//! This module owns the HTTP conversation with the upstream endpoint:
//! merging default query parameters with call-specific ones, parsing the
//! wire format, and turning anything other than a well-formed ok response
//! into a [`GatewayError`]. It also owns the availability probe, a
//! lightweight `flickr.test.echo` call whose result is memoized per
//! gateway instance so repeated domain calls do not hammer the upstream.
//!
//! # Example
//!
//! ```no_run
//! use flickr_gallery::gateway::{FlickrGateway, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = FlickrGateway::new("0123456789abcdef")?;
//!
//!     if gateway.is_available().await {
//!         let response = gateway
//!             .query(
//!                 "flickr.photosets.getList",
//!                 &[("user_id".to_string(), "132044853@N08".to_string())],
//!             )
//!             .await?;
//!         println!("{}", response["photosets"]["photoset"]);
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::config::{FlickrConfig, DEFAULT_ENDPOINT};
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "flickr-gallery/0.1";

/// Echo method used by the availability probe
const METHOD_ECHO: &str = "flickr.test.echo";

/// Recorded outcome of the availability probe
///
/// On failure the upstream-supplied error code and message are kept for
/// consumers to inspect, e.g. `code: 100, message: "Invalid API Key"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStatus {
    /// Whether the upstream answered the echo call with an ok status
    pub available: bool,
    /// Upstream error code when the probe failed
    pub code: Option<u64>,
    /// Upstream error message when the probe failed
    pub message: Option<String>,
}

/// Transport abstraction the service talks through
///
/// Injected as a trait object so tests can script responses without a
/// network.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Issue one API method call and return the parsed response tree
    async fn query(
        &self,
        method: &str,
        params: &[(String, String)],
    ) -> Result<Value, GatewayError>;

    /// Whether the upstream is currently reachable and the key accepted.
    /// Memoized per gateway instance.
    async fn is_available(&self) -> bool;

    /// Recorded probe outcome, if the probe has run
    async fn probe_status(&self) -> Option<ProbeStatus>;
}

/// HTTP gateway against the Flickr REST endpoint
pub struct FlickrGateway {
    client: Client,
    endpoint: Url,
    api_key: RwLock<String>,
    probe: RwLock<Option<ProbeStatus>>,
}

impl FlickrGateway {
    /// Create a gateway with default settings for the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, GatewayError> {
        Self::builder().api_key(api_key).build()
    }

    /// Create a builder for configuring the gateway
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Create a gateway from a configuration value
    pub fn from_config(config: &FlickrConfig) -> Result<Self, GatewayError> {
        let mut builder = Self::builder()
            .api_key(&config.api_key)
            .endpoint(&config.endpoint);

        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        builder.build()
    }

    /// The REST endpoint this gateway queries
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Current API key
    pub async fn api_key(&self) -> String {
        self.api_key.read().await.clone()
    }

    /// Replace the API key for subsequent requests
    ///
    /// Keys can rotate between calls without reconstructing the gateway.
    pub async fn set_api_key(&self, key: impl Into<String>) {
        *self.api_key.write().await = key.into();
    }

    /// Forget the memoized probe result so the next availability check
    /// queries the upstream again
    pub async fn reset_probe(&self) {
        *self.probe.write().await = None;
    }

    /// Parameters present on every request. Call-specific parameters
    /// with the same key take precedence over these.
    async fn default_params(&self) -> Vec<(String, String)> {
        vec![
            ("api_key".to_string(), self.api_key.read().await.clone()),
            ("format".to_string(), "json".to_string()),
            ("nojsoncallback".to_string(), "1".to_string()),
        ]
    }

    async fn run_probe(&self) -> ProbeStatus {
        match self.query(METHOD_ECHO, &[]).await {
            Ok(_) => ProbeStatus {
                available: true,
                code: None,
                message: None,
            },
            Err(GatewayError::UnexpectedResponse { raw }) => {
                // The upstream answered but reported failure; keep its
                // error code and message for consumers.
                let (code, message) = parse_failure(&raw);
                warn!("Flickr availability probe failed: {}", raw);
                ProbeStatus {
                    available: false,
                    code,
                    message,
                }
            }
            Err(err) => {
                warn!("Flickr availability probe failed: {}", err);
                ProbeStatus {
                    available: false,
                    code: None,
                    message: None,
                }
            }
        }
    }
}

#[async_trait]
impl Gateway for FlickrGateway {
    async fn query(
        &self,
        method: &str,
        params: &[(String, String)],
    ) -> Result<Value, GatewayError> {
        let query = merge_params(self.default_params().await, method, params);

        debug!(
            "GET {} method={} ({} call params)",
            self.endpoint,
            method,
            params.len()
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await?;
        let raw = response.text().await?;

        let parsed: Value =
            serde_json::from_str(&raw).map_err(|_| GatewayError::unexpected(&raw))?;

        if parsed.get("stat").and_then(Value::as_str) != Some("ok") {
            warn!("Flickr reported failure: {}", raw);
            return Err(GatewayError::unexpected(raw));
        }

        Ok(parsed)
    }

    async fn is_available(&self) -> bool {
        if let Some(status) = self.probe.read().await.as_ref() {
            return status.available;
        }

        let status = self.run_probe().await;
        let available = status.available;
        *self.probe.write().await = Some(status);
        available
    }

    async fn probe_status(&self) -> Option<ProbeStatus> {
        self.probe.read().await.clone()
    }
}

/// Merge default parameters, the method selector and call-specific
/// parameters. Defaults are always present; on duplicate keys the
/// call-specific value wins.
fn merge_params(
    defaults: Vec<(String, String)>,
    method: &str,
    params: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged = defaults;
    merged.push(("method".to_string(), method.to_string()));

    for (key, value) in params {
        match merged.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.clone(),
            None => merged.push((key.clone(), value.clone())),
        }
    }

    merged
}

/// Pull `code` and `message` out of a raw failure body, e.g.
/// `{"stat":"fail","code":100,"message":"Invalid API Key"}`
fn parse_failure(raw: &str) -> (Option<u64>, Option<String>) {
    let Ok(body) = serde_json::from_str::<Value>(raw) else {
        return (None, None);
    };

    let code = body.get("code").and_then(|code| match code {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    });
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    (code, message)
}

/// Builder for configuring a [`FlickrGateway`]
#[derive(Debug)]
pub struct GatewayBuilder {
    api_key: String,
    endpoint: String,
    timeout: Option<Duration>,
    user_agent: String,
    client: Option<Client>,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            client: None,
        }
    }
}

impl GatewayBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set the REST endpoint (tests point this at a local server)
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request timeout. Without one, requests wait indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client, e.g. to share a connection pool
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<FlickrGateway, GatewayError> {
        let endpoint = Url::parse(&self.endpoint)?;

        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder().user_agent(&self.user_agent);
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(FlickrGateway {
            client,
            endpoint,
            api_key: RwLock::new(self.api_key),
            probe: RwLock::new(None),
        })
    }
}
