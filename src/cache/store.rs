//! In-memory storage for cached query results.

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::keys::CacheKey;

struct CachedEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Storage backing the query cache: serialized results keyed by `CacheKey`.
///
/// `QueryCache` owns the TTL policy and the (de)serialization; a store owns
/// placement, expiry bookkeeping, and eviction.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<serde_json::Value>;
    fn put(&self, key: CacheKey, value: serde_json::Value, ttl: Duration);
    /// Remove one entry, reporting whether it was present.
    fn forget(&self, key: &CacheKey) -> bool;
}

/// Bounded LRU store holding serialized results with per-entry expiry.
///
/// Entries are dropped lazily: an expired value is removed the next time it
/// is looked up, or earlier when capacity pressure evicts it.
pub struct MemoryStore {
    entries: RwLock<LruCache<CacheKey, CachedEntry>>,
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let mut entries = self.write_entries("get");
        match entries.get(key) {
            Some(entry) if entry.is_fresh(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: CacheKey, value: serde_json::Value, ttl: Duration) {
        let entry = CachedEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.write_entries("put");
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            // push also returns the replaced pair on overwrite; only a
            // different key means a row was pushed out by capacity.
            if evicted != key {
                counter!("biblio_cache_evict_total").increment(1);
            }
        }
    }

    fn forget(&self, key: &CacheKey) -> bool {
        self.write_entries("forget").pop(key).is_some()
    }
}

impl MemoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn clear(&self) {
        self.write_entries("clear").clear();
    }

    pub fn len(&self) -> usize {
        self.read_entries("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_entries(
        &self,
        op: &'static str,
    ) -> RwLockReadGuard<'_, LruCache<CacheKey, CachedEntry>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    target = "biblio::cache",
                    op,
                    lock_kind = "read",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }

    fn write_entries(
        &self,
        op: &'static str,
    ) -> RwLockWriteGuard<'_, LruCache<CacheKey, CachedEntry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    target = "biblio::cache",
                    op,
                    lock_kind = "write",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

/// Memoizing wrapper the services call through for every read.
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    enabled: bool,
}

impl QueryCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, enabled: bool) -> Self {
        Self {
            store,
            ttl,
            enabled,
        }
    }

    /// Passthrough cache for deployments that switch caching off.
    pub fn disabled() -> Self {
        Self {
            store: Arc::new(MemoryStore::new(NonZeroUsize::MIN)),
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the cached value under `key`, or run `producer` and cache its
    /// success. Producer errors propagate to the caller and are never stored.
    pub async fn remember<T, E, F, Fut>(&self, key: &CacheKey, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return producer().await;
        }

        if let Some(value) = self.store.get(key) {
            match serde_json::from_value(value) {
                Ok(decoded) => {
                    counter!("biblio_cache_hit_total").increment(1);
                    return Ok(decoded);
                }
                Err(err) => {
                    // An undecodable entry counts as a miss and gets replaced.
                    warn!(
                        target = "biblio::cache",
                        key = %key,
                        error = %err,
                        "Dropping undecodable cache entry"
                    );
                    self.store.forget(key);
                }
            }
        }

        counter!("biblio_cache_miss_total").increment(1);
        let produced = producer().await?;
        match serde_json::to_value(&produced) {
            Ok(value) => self.store.put(key.clone(), value, self.ttl),
            Err(err) => {
                warn!(
                    target = "biblio::cache",
                    key = %key,
                    error = %err,
                    "Skipping cache store for unserializable value"
                );
            }
        }
        Ok(produced)
    }

    /// Drop the entry under `key`, if any.
    pub fn forget(&self, key: &CacheKey) {
        if !self.enabled {
            return;
        }
        if self.store.forget(key) {
            counter!("biblio_cache_forget_total").increment(1);
        }
    }
}
