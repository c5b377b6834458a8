//! Error reporting sink
//!
//! The service reports each failure event as a single error-level line
//! through an injected sink, so embedding applications can route these
//! lines into their own logging setup. The default forwards to `tracing`.

/// Sink receiving one error-level message per failure event
pub trait ErrorSink: Send + Sync {
    /// Report a failure
    fn error(&self, message: &str);
}

/// Default sink forwarding to `tracing::error!`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ErrorSink for NullSink {
    fn error(&self, _message: &str) {}
}
