//! Read-only client and cache layer for the Flickr REST API
//!
//! This crate exposes Flickr photosets (albums) and photos to a consuming
//! application, shielding it from the upstream's intermittent
//! unreliability:
//!
//! - **Transport gateway**: issues the REST calls, merges default query
//!   parameters, validates the wire format, and memoizes an availability
//!   probe per instance
//! - **Domain model**: `Photo` and `Photoset` value types built through
//!   validating factories; derived media URLs at 11 fixed renditions with
//!   no further API calls
//! - **Service**: the three query operations (photosets of a user, one
//!   photoset, photos in a photoset), each absorbing upstream failures
//!   into "nothing available" rather than errors
//! - **Two-tier cache**: a soft expiry bounds staleness under normal
//!   operation, a hard expiry bounds how long a deleted upstream resource
//!   can appear to exist, and a stale-but-present value is served
//!   whenever a live refresh fails
//!
//! # Example
//!
//! ```no_run
//! use flickr_gallery::{FlickrConfig, FlickrService, Query, SizeCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FlickrConfig::new("0123456789abcdef");
//!     let service = FlickrService::from_config(config)?;
//!
//!     // Plain call: straight to the API (gated on the availability probe)
//!     if let Some(sets) = service.photosets_for_user("132044853@N08").await {
//!         for set in &sets {
//!             println!("{}: {}", set.title, set.url());
//!         }
//!
//!         // A photoset resolves its photos through a further call
//!         if let Some(first) = sets.first() {
//!             for photo in first.photos(&service).await.unwrap_or_default() {
//!                 println!("  {}", photo.url(SizeCode::Thumbnail));
//!             }
//!         }
//!     }
//!
//!     // Cache-wrapped call: serves cached data inside the soft-expiry
//!     // window and falls back to stale data when the API is down
//!     let query = Query::PhotosetsForUser {
//!         user_id: "132044853@N08".to_string(),
//!     };
//!     let _cached = service.cached_call(&query).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Caching
//!
//! Cache entries are keyed by a digest over the operation name and its
//! ordered arguments. Each entry lives in the injected [`CacheStore`]
//! with the hard expiry as its TTL (default 1 day); the service compares
//! the entry's age against the soft expiry (default 1 hour) to decide
//! whether a live refresh is due. Collaborators — gateway, store, error
//! sink, configuration — are all injected at construction, so tests and
//! embedding applications can substitute their own.
//!
//! # Limits
//!
//! All operations fetch the complete result set in one response page; no
//! pagination is attempted. Only read operations and static-key
//! authentication are supported.

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod log;
pub mod models;
pub mod service;

// Re-exports
pub use cache::{CacheEntry, CacheStore, MemoryStore};
pub use config::{ConfigError, FlickrConfig};
pub use error::{GatewayError, Result, ServiceError};
pub use gateway::{FlickrGateway, Gateway, GatewayBuilder, ProbeStatus};
pub use log::{ErrorSink, NullSink, TracingSink};
pub use models::{Photo, Photoset, SizeCode, UrlScheme};
pub use service::{cache_key, FlickrService, Query, QueryResult};
