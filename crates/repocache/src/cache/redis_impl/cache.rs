//! Redis cache implementation.
//!
//! Values are stored as plain strings under the derived keys, so entries can
//! be inspected with `redis-cli GET "User:get_by_email:a@x.com"`.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use repocache_core::cache::{Cache, Result};

use super::error::map_redis_error;

/// Redis cache backend using connection manager for pooling.
///
/// The connection manager reconnects on its own after a dropped connection;
/// calls made while the server is down fail with `CacheError::Unavailable`.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        tracing::debug!(%url, "Connected to Redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                // SET EX has second granularity
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Connects to `REDIS_URL`, or returns `None` so the caller can skip.
    async fn connect_or_skip(test: &str) -> Option<RedisCache> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let cache = RedisCache::new(&url).await.ok();
        if cache.is_none() {
            eprintln!("Skipping {test}: Redis not available");
        }
        cache
    }

    /// A key no other test run can collide with.
    fn scratch_key(operation: &str) -> String {
        format!("Scratch:{operation}:{}", Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_value_round_trips_as_bytes() {
        let Some(cache) = connect_or_skip("value_round_trips").await else {
            return;
        };
        let key = scratch_key("get_by_id");

        cache.set(&key, br#"{"id":1}"#, None).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(br#"{"id":1}"#.to_vec()));
        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_key_reads_none_and_deletes_ok() {
        let Some(cache) = connect_or_skip("missing_key").await else {
            return;
        };
        let key = scratch_key("missing");

        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert!(cache.delete(&key).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_value() {
        let Some(cache) = connect_or_skip("delete_removes_value").await else {
            return;
        };
        let key = scratch_key("is_email_unique");
        cache.set(&key, b"true", None).await.unwrap();

        cache.delete(&key).await.unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let Some(cache) = connect_or_skip("entry_expires").await else {
            return;
        };
        let key = scratch_key("ttl");

        cache
            .set(&key, b"false", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sub_second_ttl_rounds_up() {
        let Some(cache) = connect_or_skip("sub_second_ttl").await else {
            return;
        };
        let key = scratch_key("short_ttl");

        cache
            .set(&key, b"null", Some(Duration::from_millis(10)))
            .await
            .unwrap();

        assert!(cache.get(&key).await.unwrap().is_some());
        cache.delete(&key).await.unwrap();
    }
}
