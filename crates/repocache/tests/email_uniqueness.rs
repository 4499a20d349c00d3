//! End-to-end email uniqueness checks through the wired application state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use repocache::cache::MemoryCache;
use repocache::storage::InMemoryStore;
use repocache::users::{by_email_key, email_unique_key, User, UserRepository};
use repocache::{AppState, CacheSettings};
use repocache_core::cache::{Cache, CacheError, Result as CacheResult};
use repocache_core::storage::{Repository, RepositoryError, Store};

/// Memory cache that can be switched off to simulate an outage.
struct SwitchableCache {
    inner: MemoryCache,
    down: AtomicBool,
}

impl SwitchableCache {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCache::new(1_000),
            down: AtomicBool::new(false),
        })
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> CacheResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for SwitchableCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }
}

fn state_with(cache: Arc<SwitchableCache>, ttl: Duration) -> AppState {
    AppState::build(
        Arc::new(InMemoryStore::new()),
        cache,
        &CacheSettings::new(ttl, Duration::ZERO),
    )
}

#[tokio::test]
async fn test_delete_frees_email_and_clears_cached_answers() {
    let cache = SwitchableCache::new();
    let state = state_with(cache.clone(), Duration::from_secs(600));

    let user = state.users.add_user(User::new("A", "a@x.com")).await.unwrap();

    assert!(!state.users.is_email_unique("a@x.com").await.unwrap());
    assert_eq!(
        cache.get(&email_unique_key("a@x.com")).await.unwrap(),
        Some(b"false".to_vec())
    );
    assert!(state.users.get_by_email("a@x.com").await.unwrap().is_some());
    assert!(cache.get(&by_email_key("a@x.com")).await.unwrap().is_some());

    state.users.delete(&user.id).await.unwrap();

    assert!(cache.get(&email_unique_key("a@x.com")).await.unwrap().is_none());
    assert!(cache.get(&by_email_key("a@x.com")).await.unwrap().is_none());
    assert!(state.users.is_email_unique("a@x.com").await.unwrap());
    assert!(state.users.get_by_email("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_twice_is_not_found() {
    let state = state_with(SwitchableCache::new(), Duration::from_secs(600));
    let user = state.users.add_user(User::new("A", "a@x.com")).await.unwrap();

    state.users.delete(&user.id).await.unwrap();
    let err = state.users.delete(&user.id).await.unwrap_err();

    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[tokio::test]
async fn test_duplicate_email_is_constraint_violation() {
    let state = state_with(SwitchableCache::new(), Duration::from_secs(600));
    state.users.add_user(User::new("A", "a@x.com")).await.unwrap();

    let err = state
        .users
        .add_user(User::new("Other A", "A@X.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));
    assert_eq!(state.users.list(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reads_fall_through_while_cache_is_down() {
    let cache = SwitchableCache::new();
    let state = state_with(cache.clone(), Duration::from_secs(600));
    state.users.add_user(User::new("A", "a@x.com")).await.unwrap();

    cache.set_down(true);

    assert!(!state.users.is_email_unique("a@x.com").await.unwrap());
    assert!(state.users.is_email_unique("b@x.com").await.unwrap());
    assert_eq!(state.users.list(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_write_succeeds_when_invalidation_cannot_reach_cache() {
    let cache = SwitchableCache::new();
    let state = state_with(cache.clone(), Duration::from_secs(600));
    let user = state.users.add_user(User::new("A", "a@x.com")).await.unwrap();
    assert!(!state.users.is_email_unique("a@x.com").await.unwrap());

    cache.set_down(true);
    state.users.delete(&user.id).await.unwrap();
    cache.set_down(false);

    let doc = state.store.document("User", &user.id.to_string()).await;
    assert!(doc.unwrap().is_none());
    // the answer cached before the outage is stale until it expires
    assert!(!state.users.is_email_unique("a@x.com").await.unwrap());
}

#[tokio::test]
async fn test_cached_answer_expires_after_ttl() {
    let cache = SwitchableCache::new();
    let state = state_with(cache.clone(), Duration::from_millis(50));
    let user = state.users.add_user(User::new("A", "a@x.com")).await.unwrap();
    assert!(!state.users.is_email_unique("a@x.com").await.unwrap());

    cache.set_down(true);
    state.users.delete(&user.id).await.unwrap();
    cache.set_down(false);
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(cache.get(&email_unique_key("a@x.com")).await.unwrap().is_none());
    assert!(state.users.is_email_unique("a@x.com").await.unwrap());
}
