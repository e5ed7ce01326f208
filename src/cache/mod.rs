//! Cache module for rendered pages and content listings
//!
//! Caching goes through the [`CacheStore`] trait so the backend can be swapped
//! for a shared external store. Values are stored as strings; [`ContentCache`]
//! serializes typed values as YAML and implements get-or-compute on top.
//! YAML keeps front-matter values (tags, non-string keys, `.inf`) intact.
//!
//! Concurrent first access may compute the same value twice. Computation is
//! side-effect free, so the second write just replaces an identical value.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::error::Result;

/// Key-value cache backend
pub trait CacheStore: Send + Sync {
    /// Get a live value
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value for `ttl`
    fn set(&self, key: &str, value: String, ttl: Duration);

    /// Remove a value
    fn forget(&self, key: &str);
}

/// A cached value with its expiry
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache store with TTL expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        let now = Instant::now();
        // very large TTLs saturate to one year
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 3600));
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), CacheEntry { value, expires_at });
        }
    }

    fn forget(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Typed get-or-compute cache over a [`CacheStore`]
///
/// Every key written is recorded under `{namespace}_cache_keys` so that
/// [`ContentCache::clear`] can forget them later.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    enabled: bool,
    ttl: Duration,
}

impl ContentCache {
    /// Create a cache from configuration
    pub fn new(store: Arc<dyn CacheStore>, namespace: &str, config: &CacheConfig) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl),
        }
    }

    /// A cache that always computes
    pub fn disabled() -> Self {
        Self {
            store: Arc::new(MemoryCache::new()),
            namespace: "disabled".to_string(),
            enabled: false,
            ttl: Duration::ZERO,
        }
    }

    /// Whether values are cached at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get a value, or compute and store it
    pub fn remember<T, F>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        self.remember_if(key, compute, |_| true)
    }

    /// Like [`remember`](Self::remember), but only stores values accepted by `keep`
    pub fn remember_if<T, F, K>(&self, key: &str, compute: F, keep: K) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
        K: FnOnce(&T) -> bool,
    {
        if !self.enabled {
            return compute();
        }

        if let Some(raw) = self.store.get(key) {
            match serde_yaml::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!("Cache hit: {}", key);
                    return Ok(value);
                }
                Err(e) => tracing::warn!("Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let value = compute()?;
        if keep(&value) {
            self.store.set(key, serde_yaml::to_string(&value)?, self.ttl);
            self.track(key);
        }
        Ok(value)
    }

    /// Forget every key this cache has written
    pub fn clear(&self) {
        let index = self.index_key();
        for key in self.tracked_keys() {
            self.store.forget(&key);
        }
        self.store.forget(&index);
        tracing::debug!("Cleared cache namespace {}", self.namespace);
    }

    /// Build a namespaced key
    pub fn key(&self, parts: &[&str]) -> String {
        let mut key = self.namespace.clone();
        for part in parts {
            key.push('_');
            key.push_str(part);
        }
        key
    }

    fn index_key(&self) -> String {
        format!("{}_cache_keys", self.namespace)
    }

    fn tracked_keys(&self) -> Vec<String> {
        self.store
            .get(&self.index_key())
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn track(&self, key: &str) {
        let mut keys = self.tracked_keys();
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            if let Ok(raw) = serde_json::to_string(&keys) {
                // the index outlives the entries it points at
                self.store
                    .set(&self.index_key(), raw, self.ttl.saturating_mul(2));
            }
        }
    }
}

/// Hex digest of `content`, used to build cache keys. Stable across builds,
/// so keys stay valid in a store shared between processes.
pub fn hash_content(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}
