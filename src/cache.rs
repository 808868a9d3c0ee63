//! Expiring memoization used by the headline fetcher and the sentiment extractor.
//!
//! The cache is an explicit collaborator: both components take an
//! `Arc<dyn ExpiringCache<_>>`, so tests can pre-seed or inspect it.
//! Keys are SHA-256 digests of the normalized call parameters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Default horizon for both fetch results and sentiment records.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

pub trait ExpiringCache<V>: Send + Sync {
    /// Returns a clone of the live value for `key`, if any.
    fn get(&self, key: &str) -> Option<V>;
    /// Stores `value` until `expires_at` (absolute, no sliding refresh).
    fn put(&self, key: &str, value: V, expires_at: Instant);
}

/// Process-wide in-memory cache guarded by a mutex. Expired entries are
/// evicted lazily on read.
pub struct MemoryCache<V> {
    inner: Mutex<HashMap<String, (V, Instant)>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (V, Instant)>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send> ExpiringCache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut map = self.lock();
        let now = Instant::now();
        match map.get(key) {
            Some((value, expires_at)) if now < *expires_at => Some(value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: V, expires_at: Instant) {
        self.lock().insert(key.to_string(), (value, expires_at));
    }
}

/// Per-key async locks so that identical concurrent requests compute once.
/// Callers lock, re-check the cache, then compute.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        // Drop locks nobody else holds; keeps the map from growing forever.
        map.retain(|k, l| k == key || Arc::strong_count(l) > 1);
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Deterministic cache key over an ordered list of parts. Parts are
/// length-prefixed so `["ab", "c"]` and `["a", "bc"]` never collide.
pub fn cache_key<I, S>(namespace: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    for p in parts {
        let p = p.as_ref();
        hasher.update((p.len() as u64).to_le_bytes());
        hasher.update(p.as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_entry_is_returned() {
        let c: MemoryCache<u32> = MemoryCache::new();
        c.put("k", 7, Instant::now() + Duration::from_secs(60));
        assert_eq!(c.get("k"), Some(7));
        assert_eq!(c.get("other"), None);
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let c: MemoryCache<u32> = MemoryCache::new();
        c.put("k", 7, Instant::now());
        assert_eq!(c.get("k"), None);
        assert!(c.is_empty());
    }

    #[test]
    fn key_is_stable_and_boundary_safe() {
        let a = cache_key("ns", ["ab", "c"]);
        let b = cache_key("ns", ["a", "bc"]);
        assert_ne!(a, b);
        assert_eq!(a, cache_key("ns", ["ab", "c"]));
        assert_ne!(a, cache_key("other", ["ab", "c"]));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn keyed_locks_share_one_lock_per_key() {
        let locks = KeyedLocks::new();
        let a = locks.lock_for("x");
        let b = locks.lock_for("x");
        assert!(Arc::ptr_eq(&a, &b));

        let _held = a.lock().await;
        assert!(b.try_lock().is_err());
        let c = locks.lock_for("y");
        assert!(c.try_lock().is_ok());
    }
}
