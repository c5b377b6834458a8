//! Error types for the Flickr client

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors raised by the transport gateway
///
/// These never reach consumers of the service layer directly; the service
/// absorbs them into "nothing available" returns. They stay typed so the
/// cache wrapper and tests can distinguish a transport failure from a
/// record that merely failed validation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (unreachable host, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid endpoint URL
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The body could not be parsed, or the parsed structure did not
    /// report an ok status. The raw body rides along for diagnosis.
    #[error("Unexpected response from Flickr: {raw}")]
    UnexpectedResponse {
        /// Raw (unparsed) response body
        raw: String,
    },
}

impl GatewayError {
    /// Create an unexpected-response error from a raw body
    pub fn unexpected(raw: impl Into<String>) -> Self {
        Self::UnexpectedResponse { raw: raw.into() }
    }
}

/// Errors raised by the service layer
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The availability probe reported the upstream as unreachable.
    /// An expected condition, not logged as a failure by the plain
    /// query operations.
    #[error("Flickr API is not available")]
    Unavailable,

    /// The underlying transport failed
    #[error("Transport error: {0}")]
    Transport(#[from] GatewayError),

    /// The service was invoked in a way that indicates a coding defect
    /// (e.g. a cached call without a discriminating argument)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Create a configuration error from a message
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error came from the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
