//! Application state with repository-based storage.
//!
//! Wires one store, one cache and the event bus into the cached user
//! repository. The store and cache backends are picked by feature flags:
//! `sqlite` swaps the in-memory store for SQLite and `redis` swaps the
//! in-memory cache for Redis.

use std::sync::Arc;

use repocache_core::cache::Cache;
use repocache_core::storage::Store;

use crate::config::{CacheSettings, Config};
use crate::events::{EventBus, EventDispatcher};
use crate::storage::{CachedRepository, StoreRepository};
use crate::users::{subscribe_user_invalidation, User};

/// The user repository as the application sees it: cache-aside over the
/// store-backed repository.
pub type Users = CachedRepository<User, StoreRepository<User>, dyn Cache>;

/// Shared application state.
///
/// Cloning is cheap; clones share the store, the cache and the repository.
#[derive(Clone)]
pub struct AppState {
    /// Backing store shared by every repository.
    pub store: Arc<dyn Store>,
    /// Cache shared by the cached repositories and the invalidation handlers.
    pub cache: Arc<dyn Cache>,
    /// Cached user repository.
    pub users: Arc<Users>,
}

impl AppState {
    /// Creates state over the backends selected by the enabled features.
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let store = open_store(config).await?;
        let cache = open_cache(config).await?;
        Ok(Self::build(store, cache, &config.cache))
    }

    /// Wires the event bus and repositories over an existing store and cache.
    ///
    /// Invalidation handlers are subscribed before the bus is shared, so
    /// every write made through the returned repositories is covered.
    pub fn build(store: Arc<dyn Store>, cache: Arc<dyn Cache>, settings: &CacheSettings) -> Self {
        let mut bus = EventBus::new();
        subscribe_user_invalidation(&mut bus, cache.clone());
        let dispatcher = EventDispatcher::new(Arc::new(bus));

        let store_repo = Arc::new(StoreRepository::<User>::new(store.clone(), dispatcher));
        let users = Arc::new(Users::new(store_repo, cache.clone(), settings));

        Self {
            store,
            cache,
            users,
        }
    }
}

#[cfg(not(feature = "sqlite"))]
async fn open_store(_config: &Config) -> Result<Arc<dyn Store>, anyhow::Error> {
    tracing::info!("Using in-memory store");
    Ok(Arc::new(crate::storage::InMemoryStore::new()))
}

#[cfg(feature = "sqlite")]
async fn open_store(config: &Config) -> Result<Arc<dyn Store>, anyhow::Error> {
    tracing::info!(path = %config.sqlite_path, "Using SQLite store");
    let store = crate::storage::SqliteStore::new(&config.sqlite_path).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_cache(config: &Config) -> Result<Arc<dyn Cache>, anyhow::Error> {
    tracing::info!(max_entries = config.cache_max_entries, "Using in-memory cache");
    Ok(Arc::new(crate::cache::MemoryCache::new(config.cache_max_entries)))
}

#[cfg(feature = "redis")]
async fn open_cache(config: &Config) -> Result<Arc<dyn Cache>, anyhow::Error> {
    tracing::info!(url = %config.redis_url, "Using Redis cache");
    let cache = crate::cache::RedisCache::new(&config.redis_url).await?;
    Ok(Arc::new(cache))
}
