//! In-memory cache implementation with LRU eviction.
//!
//! Provides a thread-safe in-memory cache with TTL support using
//! tokio synchronization primitives and LRU eviction policy.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use repocache_core::cache::{Cache, Result};

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// A TTL too large to represent as an instant never expires.
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.and_then(|d| Instant::now().checked_add(d));
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// In-memory cache implementation with LRU eviction.
///
/// Cloning shares the underlying store, so one instance can back several
/// repositories in the same process. Expired entries are dropped lazily
/// when read.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
}

impl MemoryCache {
    /// Creates a new in-memory cache holding at most `max_entries` values.
    ///
    /// A capacity of 0 is raised to 1.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or_else(|| {
            tracing::warn!("cache max_entries must be > 0, using 1");
            NonZeroUsize::MIN
        });
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.write().await;

        match store.get(key) {
            Some(entry) if entry.is_expired() => {
                store.pop(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut store = self.store.write().await;
        store.put(key.to_string(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.write().await.pop(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MAX_ENTRIES: usize = 1000;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache.set("User:list", b"[]", None).await.unwrap();

        assert_eq!(cache.get("User:list").await.unwrap(), Some(b"[]".to_vec()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        assert_eq!(cache.get("User:get_by_id:missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let key = "User:get_by_email:a@x.com";

        cache.set(key, b"{}", None).await.unwrap();
        cache.delete(key).await.unwrap();

        assert!(cache.get(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        assert!(cache.delete("never:set").await.is_ok());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let key = "test:ttl";

        cache
            .set(key, b"short-lived", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(cache.get(key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get(key).await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache.set("test:no-ttl", b"persistent", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(cache.get("test:no-ttl").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_value_resets_ttl() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let key = "test:overwrite";

        cache
            .set(key, b"first", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        cache.set(key, b"second", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.get(key).await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryCache::new(3);

        cache.set("key1", b"value1", None).await.unwrap();
        cache.set("key2", b"value2", None).await.unwrap();
        cache.set("key3", b"value3", None).await.unwrap();

        // Touch key1 so key2 becomes least recently used
        cache.get("key1").await.unwrap();
        cache.set("key4", b"value4", None).await.unwrap();

        assert!(cache.get("key1").await.unwrap().is_some());
        assert!(cache.get("key2").await.unwrap().is_none());
        assert!(cache.get("key3").await.unwrap().is_some());
        assert!(cache.get("key4").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let other = cache.clone();

        cache.set("shared", b"1", None).await.unwrap();

        assert_eq!(other.get("shared").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_zero_max_entries_is_raised_to_one() {
        let cache = MemoryCache::new(0);

        cache.set("a", b"1", None).await.unwrap();
        cache.set("b", b"2", None).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(cache.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache.set("test:huge-ttl", b"1", Some(Duration::MAX)).await.unwrap();

        assert_eq!(cache.get("test:huge-ttl").await.unwrap(), Some(b"1".to_vec()));
    }
}
