//! Generic key-value cache store with per-entry age tracking
//!
//! The store enforces the hard expiry through its own TTL: entries older
//! than their TTL are reported as absent and dropped. The service layers
//! its soft-expiry policy on top by comparing the age the store reports
//! against the configured soft bound.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// A cached value together with its age since last write
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// Time elapsed since the entry was last written
    pub age: Duration,
}

/// Key-value store with a TTL per entry and a last-write age per key
///
/// `get` must not return entries older than their TTL; evicting them is
/// the store's own concern. `set` overwrites in place and resets the age
/// to zero (last writer wins per key).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry. Hard-expired entries are reported as absent.
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Write an entry with the given TTL, resetting its age to zero
    async fn set(&self, key: &str, value: Value, ttl: Duration);
}

struct StoredEntry {
    value: Value,
    written_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn age(&self) -> Duration {
        self.written_at.elapsed()
    }

    fn expired(&self) -> bool {
        self.age() >= self.ttl
    }
}

/// In-memory [`CacheStore`]
///
/// Concurrent readers share the map; writes take the lock exclusively.
/// Expired entries are skipped on read and removed by [`purge_expired`].
///
/// [`purge_expired`]: MemoryStore::purge_expired
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|entry| !entry.expired()).count()
    }

    /// Whether the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired());
        before - entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        let stored = entries.get(key)?;
        let age = stored.age();

        if age >= stored.ttl {
            debug!(
                "cache entry {} hard-expired (age {}s >= ttl {}s)",
                key,
                age.as_secs(),
                stored.ttl.as_secs()
            );
            return None;
        }

        Some(CacheEntry {
            value: stored.value.clone(),
            age,
        })
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                written_at: Instant::now(),
                ttl,
            },
        );
    }
}
