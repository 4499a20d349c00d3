use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::serialization::{deserialize, serialize};
use super::Result;

/// Trait for basic cache operations.
///
/// Implementations are shared between repository instances and must be
/// safe to call concurrently.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value from the cache by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value in the cache with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deletes a value from the cache by key.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Cache-aside read of a typed value.
///
/// Returns the cached value when present and decodable. Otherwise runs
/// `populate`, stores its result under `key` with `ttl` and returns it.
/// Cache failures (unreachable cache, undecodable payload, failed write) are
/// logged and never fail the read; only `populate` errors propagate.
///
/// No lock is taken: concurrent misses may each run `populate` and the last
/// write wins.
pub async fn get_or_populate<C, T, F, Fut, E>(
    cache: &C,
    key: &str,
    ttl: Duration,
    populate: F,
) -> std::result::Result<T, E>
where
    C: Cache + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    match cache.get(key).await {
        Ok(Some(bytes)) => match deserialize::<T>(&bytes) {
            Ok(value) => {
                tracing::trace!(%key, "Cache hit");
                return Ok(value);
            }
            Err(err) => tracing::warn!(%key, error = %err, "Cached value undecodable, treating as miss"),
        },
        Ok(None) => tracing::trace!(%key, "Cache miss"),
        Err(err) => tracing::warn!(%key, error = %err, "Cache read failed, falling back to store"),
    }

    let value = populate().await?;
    put(cache, key, &value, ttl).await;
    Ok(value)
}

/// Writes a typed value, logging instead of failing on cache errors.
pub async fn put<C, T>(cache: &C, key: &str, value: &T, ttl: Duration)
where
    C: Cache + ?Sized,
    T: Serialize + ?Sized,
{
    match serialize(value) {
        Ok(bytes) => {
            if let Err(err) = cache.set(key, &bytes, Some(ttl)).await {
                tracing::warn!(%key, error = %err, "Failed to populate cache");
            }
        }
        Err(err) => tracing::warn!(%key, error = %err, "Failed to serialize cache value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct MockCache {
        store: RwLock<HashMap<String, Vec<u8>>>,
        ttls: RwLock<HashMap<String, Option<Duration>>>,
    }

    #[async_trait]
    impl Cache for MockCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.store.read().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
            self.store
                .write()
                .await
                .insert(key.to_string(), value.to_vec());
            self.ttls.write().await.insert(key.to_string(), ttl);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.store.write().await.remove(key);
            Ok(())
        }
    }

    struct DownCache;

    #[async_trait]
    impl Cache for DownCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> Result<()> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_miss_populates_then_hit_skips_populate() {
        let cache = MockCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: std::result::Result<Vec<u32>, ()> =
                get_or_populate(&cache, "k", TTL, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await;
            assert_eq!(value.unwrap(), vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.ttls.read().await.get("k"), Some(&Some(TTL)));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let cache = MockCache::default();
        cache.set("k", b"garbage", None).await.unwrap();

        let value: std::result::Result<u32, ()> =
            get_or_populate(&cache, "k", TTL, || async { Ok(7) }).await;

        assert_eq!(value, Ok(7));
        assert_eq!(cache.get("k").await.unwrap(), Some(b"7".to_vec()));
    }

    #[tokio::test]
    async fn test_unavailable_cache_falls_through_to_populate() {
        let value: std::result::Result<String, ()> =
            get_or_populate(&DownCache, "k", TTL, || async { Ok("from store".to_string()) })
                .await;
        assert_eq!(value, Ok("from store".to_string()));
    }

    #[tokio::test]
    async fn test_populate_error_propagates_and_nothing_is_cached() {
        let cache = MockCache::default();

        let value: std::result::Result<u32, &str> =
            get_or_populate(&cache, "k", TTL, || async { Err("store down") }).await;

        assert_eq!(value, Err("store down"));
        assert!(cache.get("k").await.unwrap().is_none());
    }
}
