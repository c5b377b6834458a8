//! Flickr service: query operations and the cache-wrapped call
//!
//! The service composes an injected [`Gateway`], [`CacheStore`] and
//! [`ErrorSink`]. The three query operations share one shape: gate on the
//! availability probe, issue the gateway call, map every element of the
//! response array through the matching factory (dropping records that
//! fail validation, preserving upstream order), and absorb any transport
//! failure into a "nothing available" return plus a single log line.
//!
//! [`cached_call`] wraps any of the operations in a two-tier expiry
//! policy. A cached value younger than the soft expiry is served without
//! touching the upstream. Once the soft expiry has elapsed the value
//! still sits in the store and a live refresh is attempted first: on
//! success the entry is overwritten, on failure the stale value is served
//! instead. The hard expiry is the store's own TTL; when it elapses the
//! entry vanishes entirely and the next call must go live.
//!
//! [`cached_call`]: FlickrService::cached_call
//!
//! # Example
//!
//! ```no_run
//! use flickr_gallery::{FlickrConfig, FlickrService, Query};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FlickrConfig::new("0123456789abcdef");
//!     let service = FlickrService::from_config(config)?;
//!
//!     let query = Query::PhotosetsForUser {
//!         user_id: "132044853@N08".to_string(),
//!     };
//!     if let Some(result) = service.cached_call(&query).await? {
//!         for set in result.into_photosets().unwrap_or_default() {
//!             println!("{}: {}", set.title, set.url());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::cache::{CacheStore, MemoryStore};
use crate::config::FlickrConfig;
use crate::error::{Result, ServiceError};
use crate::gateway::{FlickrGateway, Gateway, ProbeStatus};
use crate::log::{ErrorSink, TracingSink};
use crate::models::{Photo, Photoset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::sync::Arc;
use tracing::debug;

/// Upstream method names
const METHOD_PHOTOSET_LIST: &str = "flickr.photosets.getList";
const METHOD_PHOTOSET_INFO: &str = "flickr.photosets.getInfo";
const METHOD_PHOTOSET_PHOTOS: &str = "flickr.photosets.getPhotos";

/// Extra photo fields requested alongside the defaults
const PHOTO_EXTRAS: &str = "description,original_format";

// ============================================================================
// Queries
// ============================================================================

/// One of the three query operations, in cacheable form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// All photosets owned by a user
    PhotosetsForUser {
        /// Owner to list photosets for
        user_id: String,
    },
    /// A single photoset by id
    PhotosetById {
        /// Photoset to fetch
        photoset_id: String,
        /// Owner, when known; enables the derived web URL
        user_id: Option<String>,
    },
    /// All photos within a photoset
    PhotosInPhotoset {
        /// Photoset to list photos for
        photoset_id: String,
        /// Owner, when known; the upstream responds faster with it
        user_id: Option<String>,
    },
}

impl Query {
    /// Operation name, the first component of the cache key
    pub fn operation(&self) -> &'static str {
        match self {
            Query::PhotosetsForUser { .. } => "photosets_for_user",
            Query::PhotosetById { .. } => "photoset_by_id",
            Query::PhotosInPhotoset { .. } => "photos_in_photoset",
        }
    }

    /// Ordered argument list. The primary key comes first; the optional
    /// owner is appended only when known.
    pub fn arguments(&self) -> Vec<&str> {
        match self {
            Query::PhotosetsForUser { user_id } => vec![user_id],
            Query::PhotosetById {
                photoset_id,
                user_id,
            }
            | Query::PhotosInPhotoset {
                photoset_id,
                user_id,
            } => {
                let mut args = vec![photoset_id.as_str()];
                if let Some(user_id) = user_id {
                    args.push(user_id);
                }
                args
            }
        }
    }
}

/// Result of a query operation, in a shape the cache can round-trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    /// Ordered photoset collection
    Photosets(Vec<Photoset>),
    /// A single photoset
    Photoset(Photoset),
    /// Ordered photo collection
    Photos(Vec<Photo>),
}

impl QueryResult {
    /// Unwrap a photoset collection
    pub fn into_photosets(self) -> Option<Vec<Photoset>> {
        match self {
            QueryResult::Photosets(sets) => Some(sets),
            _ => None,
        }
    }

    /// Unwrap a single photoset
    pub fn into_photoset(self) -> Option<Photoset> {
        match self {
            QueryResult::Photoset(set) => Some(set),
            _ => None,
        }
    }

    /// Unwrap a photo collection
    pub fn into_photos(self) -> Option<Vec<Photo>> {
        match self {
            QueryResult::Photos(photos) => Some(photos),
            _ => None,
        }
    }
}

/// Deterministic cache key: hex SHA-1 over the ordered concatenation of
/// operation name and arguments
///
/// Argument order is part of the key, so the same arguments in a
/// different order address a different entry. Hashing also keeps ids out
/// of the store's key space.
pub fn cache_key(operation: &str, arguments: &[&str]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(operation.as_bytes());
    for argument in arguments {
        hasher.update(b"_");
        hasher.update(argument.as_bytes());
    }
    hex::encode(hasher.finalize())
}

// ============================================================================
// Service
// ============================================================================

/// Read-only Flickr service with a two-tier cache
pub struct FlickrService {
    gateway: Arc<dyn Gateway>,
    cache: Arc<dyn CacheStore>,
    sink: Arc<dyn ErrorSink>,
    config: FlickrConfig,
}

impl FlickrService {
    /// Create a service from explicitly injected collaborators
    pub fn new(
        config: FlickrConfig,
        gateway: Arc<dyn Gateway>,
        cache: Arc<dyn CacheStore>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            gateway,
            cache,
            sink,
            config,
        }
    }

    /// Create a service with the default gateway, in-memory store and
    /// tracing-backed sink
    pub fn from_config(config: FlickrConfig) -> Result<Self> {
        let gateway = FlickrGateway::from_config(&config)?;
        Ok(Self::new(
            config,
            Arc::new(gateway),
            Arc::new(MemoryStore::new()),
            Arc::new(TracingSink),
        ))
    }

    /// The active configuration
    pub fn config(&self) -> &FlickrConfig {
        &self.config
    }

    /// Outcome of the gateway's availability probe, if it has run
    pub async fn probe_status(&self) -> Option<ProbeStatus> {
        self.gateway.probe_status().await
    }

    // ========================================================================
    // Query operations
    // ========================================================================

    /// All photosets owned by `user_id`, in upstream order
    ///
    /// The upstream sorts photosets most-recently-created first; that
    /// order is preserved. Returns `None` when the API is unavailable or
    /// the call fails.
    pub async fn photosets_for_user(&self, user_id: &str) -> Option<Vec<Photoset>> {
        let query = Query::PhotosetsForUser {
            user_id: user_id.to_string(),
        };
        self.run_logged(&query).await?.into_photosets()
    }

    /// A single photoset by id
    ///
    /// Passing the owner enables the derived web URL. Returns `None` when
    /// the API is unavailable, the call fails, or the record fails
    /// validation.
    pub async fn photoset_by_id(
        &self,
        photoset_id: &str,
        user_id: Option<&str>,
    ) -> Option<Photoset> {
        let query = Query::PhotosetById {
            photoset_id: photoset_id.to_string(),
            user_id: user_id.map(str::to_string),
        };
        self.run_logged(&query).await?.into_photoset()
    }

    /// All photos within a photoset, in upstream order
    ///
    /// The owner is optional but the upstream responds faster with it.
    /// Returns `None` when the API is unavailable or the call fails.
    pub async fn photos_in_photoset(
        &self,
        photoset_id: &str,
        user_id: Option<&str>,
    ) -> Option<Vec<Photo>> {
        let query = Query::PhotosInPhotoset {
            photoset_id: photoset_id.to_string(),
            user_id: user_id.map(str::to_string),
        };
        self.run_logged(&query).await?.into_photos()
    }

    // ========================================================================
    // Cache-wrapped call
    // ========================================================================

    /// Run a query through the two-tier cache
    ///
    /// - Cached value younger than the soft expiry: served directly, no
    ///   upstream call.
    /// - Soft-expired (or no) cached value: a live call is attempted. On
    ///   success the entry is overwritten and the fresh result returned;
    ///   on failure the stale value is served when one exists, and the
    ///   failure is logged once either way.
    /// - Hard expiry is the store's own TTL; a hard-expired entry is gone
    ///   and the next call must go live.
    ///
    /// The only error this surfaces is [`ServiceError::Configuration`],
    /// for a query without a discriminating argument; everything else
    /// comes back as `Ok(None)`.
    pub async fn cached_call(&self, query: &Query) -> Result<Option<QueryResult>> {
        let arguments = query.arguments();

        // A query with an empty primary key would collide with other
        // argument lists hashing to the same prefix; that is a caller
        // defect, not a runtime condition.
        if arguments.is_empty() || arguments[0].is_empty() {
            return Err(ServiceError::configuration(format!(
                "cached call to '{}' requires a non-empty primary argument",
                query.operation()
            )));
        }

        let key = cache_key(query.operation(), &arguments);
        let entry = self.cache.get(&key).await;

        if let Some(entry) = &entry {
            if entry.age < self.config.soft_cache_expiry() {
                debug!(
                    "serving '{}' from cache (age {}s)",
                    query.operation(),
                    entry.age.as_secs()
                );
                if let Some(result) = decode_payload(&entry.value) {
                    return Ok(Some(result));
                }
                // Undecodable payload: treat as a miss and fall through
            }
        }

        match self.run_live(query).await {
            Ok(Some(result)) => {
                if let Ok(payload) = serde_json::to_value(&result) {
                    self.cache
                        .set(&key, payload, self.config.hard_cache_expiry())
                        .await;
                }
                Ok(Some(result))
            }
            outcome => {
                // Log once whether or not a stale value saves the call
                let detail = match outcome {
                    Err(err) => err.to_string(),
                    _ => "no result returned".to_string(),
                };
                self.sink.error(&format!(
                    "Couldn't refresh Flickr data for '{}' ({}): {}",
                    query.operation(),
                    arguments.join(", "),
                    detail
                ));

                // Soft-expired but still stored: serve the stale value
                // rather than surfacing the failure
                match entry.and_then(|entry| decode_payload(&entry.value)) {
                    Some(stale) => {
                        debug!("serving stale '{}' after live failure", query.operation());
                        Ok(Some(stale))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    // ========================================================================
    // Live dispatch
    // ========================================================================

    /// Run a query live and absorb any failure into `None`, logging one
    /// line through the sink unless suppressed by configuration.
    /// Unavailability is an expected condition and is not logged.
    async fn run_logged(&self, query: &Query) -> Option<QueryResult> {
        match self.run_live(query).await {
            Ok(result) => result,
            Err(ServiceError::Unavailable) => None,
            Err(err) => {
                if !self.config.skip_error_logging {
                    self.sink.error(&format!(
                        "Couldn't retrieve Flickr data for '{}' ({}): {}",
                        query.operation(),
                        query.arguments().join(", "),
                        err
                    ));
                }
                None
            }
        }
    }

    /// Dispatch one live query
    ///
    /// `Ok(None)` means "nothing available": a single record that failed
    /// validation. Unavailability and transport failures come back as
    /// errors for the caller to absorb.
    async fn run_live(&self, query: &Query) -> Result<Option<QueryResult>> {
        if !self.gateway.is_available().await {
            debug!("skipping '{}': API unavailable", query.operation());
            return Err(ServiceError::Unavailable);
        }

        match query {
            Query::PhotosetsForUser { user_id } => {
                let params = vec![("user_id".to_string(), user_id.clone())];
                let response = self.gateway.query(METHOD_PHOTOSET_LIST, &params).await?;

                let sets = collect_records(
                    response.pointer("/photosets/photoset"),
                    |record| Photoset::from_record(record, Some(user_id.as_str())),
                );
                Ok(Some(QueryResult::Photosets(sets)))
            }
            Query::PhotosetById {
                photoset_id,
                user_id,
            } => {
                let mut params = vec![("photoset_id".to_string(), photoset_id.clone())];
                if let Some(user_id) = user_id {
                    params.push(("user_id".to_string(), user_id.clone()));
                }
                let response = self.gateway.query(METHOD_PHOTOSET_INFO, &params).await?;

                Ok(response
                    .get("photoset")
                    .and_then(|record| Photoset::from_record(record, user_id.as_deref()))
                    .map(QueryResult::Photoset))
            }
            Query::PhotosInPhotoset {
                photoset_id,
                user_id,
            } => {
                let mut params = vec![
                    ("photoset_id".to_string(), photoset_id.clone()),
                    ("extras".to_string(), PHOTO_EXTRAS.to_string()),
                ];
                if let Some(user_id) = user_id {
                    params.push(("user_id".to_string(), user_id.clone()));
                }
                let response = self.gateway.query(METHOD_PHOTOSET_PHOTOS, &params).await?;

                let photos =
                    collect_records(response.pointer("/photoset/photo"), Photo::from_record);
                Ok(Some(QueryResult::Photos(photos)))
            }
        }
    }
}

/// Map each element of a response array through a factory, silently
/// dropping records that fail validation and preserving upstream order.
/// A missing array yields an empty collection.
fn collect_records<T>(records: Option<&Value>, factory: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    records
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(factory).collect())
        .unwrap_or_default()
}

/// Decode a cached payload; an undecodable payload reads as a miss
fn decode_payload(value: &Value) -> Option<QueryResult> {
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_is_deterministic() {
        assert_eq!(
            cache_key("photosets_for_user", &["132044853@N08"]),
            cache_key("photosets_for_user", &["132044853@N08"])
        );
    }

    #[test]
    fn test_cache_key_is_argument_order_sensitive() {
        assert_ne!(cache_key("op", &["A", "B"]), cache_key("op", &["B", "A"]));
    }

    #[test]
    fn test_cache_key_separates_operations() {
        assert_ne!(cache_key("op_a", &["x"]), cache_key("op_b", &["x"]));
    }

    #[test]
    fn test_query_arguments_order() {
        let query = Query::PhotosInPhotoset {
            photoset_id: "72157658305686922".to_string(),
            user_id: Some("132044853@N08".to_string()),
        };
        assert_eq!(query.arguments(), ["72157658305686922", "132044853@N08"]);

        let query = Query::PhotosInPhotoset {
            photoset_id: "72157658305686922".to_string(),
            user_id: None,
        };
        assert_eq!(query.arguments(), ["72157658305686922"]);
    }

    #[test]
    fn test_query_result_round_trip() {
        let set = Photoset::from_record(
            &json!({"id": "1", "title": {"_content": "One"}}),
            Some("user"),
        )
        .unwrap();
        let result = QueryResult::Photosets(vec![set]);

        let payload = serde_json::to_value(&result).unwrap();
        assert_eq!(decode_payload(&payload), Some(result));
    }

    #[test]
    fn test_decode_payload_rejects_foreign_shapes() {
        assert_eq!(decode_payload(&json!({"bogus": 1})), None);
    }

    #[test]
    fn test_collect_records_drops_invalid_and_keeps_order() {
        let records = json!([
            {"id": "1", "title": {"_content": "First"}},
            {"id": "2"},
            {"id": "3", "title": {"_content": "Third"}},
        ]);

        let sets = collect_records(Some(&records), |record| {
            Photoset::from_record(record, None)
        });
        let ids: Vec<&str> = sets.iter().map(|set| set.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn test_collect_records_missing_array_is_empty() {
        let photos = collect_records(None, Photo::from_record);
        assert!(photos.is_empty());
    }
}
