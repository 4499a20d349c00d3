//! Cache-key derivation and invalidation handlers.
//!
//! A [`CacheKeySource`] turns a domain event into the lazy stream of keys the
//! cached repository may have written for the affected entity. Key sources
//! compose: an entity-specific source yields its own keys and then chains the
//! generic [`EntityCacheKeys`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::stream::{BoxStream, Stream, StreamExt};

use repocache_core::cache::{by_id_key, dto_key, list_key, Cache, CacheError};
use repocache_core::storage::Dto;
use repocache_core::{DomainEvent, Entity, EventKind};

use super::{EventBus, EventHandler, HandlerError};

/// Derives the cache keys made stale by an event.
pub trait CacheKeySource<E: Entity>: Send + Sync {
    fn keys<'a>(&'a self, event: &'a DomainEvent<E>) -> BoxStream<'a, String>;
}

/// Keys every cached repository writes: the collection read, the
/// single-entity read and the registered DTO projections.
pub struct EntityCacheKeys<E> {
    dto_names: Vec<&'static str>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityCacheKeys<E> {
    pub fn new() -> Self {
        Self {
            dto_names: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Also invalidates the cached projection `D` of the affected entity.
    pub fn with_dto<D: Dto<E>>(mut self) -> Self {
        self.dto_names.push(D::NAME);
        self
    }
}

impl<E: Entity> Default for EntityCacheKeys<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> CacheKeySource<E> for EntityCacheKeys<E> {
    fn keys<'a>(&'a self, event: &'a DomainEvent<E>) -> BoxStream<'a, String> {
        let id = event.entity().id();
        Box::pin(stream! {
            yield list_key::<E>();
            yield by_id_key::<E>(&id);
            for name in &self.dto_names {
                yield dto_key::<E>(name, &id);
            }
        })
    }
}

/// Deletes every key of `keys` from `cache`.
///
/// Keeps going after a failed delete so one unreachable key does not leave
/// the others stale. Returns the number of deleted keys, or the last error
/// when any delete failed.
pub async fn clear_cache<C>(
    cache: &C,
    keys: impl Stream<Item = String>,
) -> Result<usize, CacheError>
where
    C: Cache + ?Sized,
{
    futures_util::pin_mut!(keys);
    let mut cleared = 0;
    let mut last_error = None;

    while let Some(key) = keys.next().await {
        match cache.delete(&key).await {
            Ok(()) => {
                tracing::trace!(%key, "Invalidated cache key");
                cleared += 1;
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "Failed to invalidate cache key");
                last_error = Some(err);
            }
        }
    }

    match last_error {
        Some(err) => Err(err),
        None => Ok(cleared),
    }
}

/// Clears the keys produced by `K` from a shared cache on every event it
/// receives.
pub struct InvalidationHandler<E, K, C: ?Sized> {
    keys: K,
    cache: Arc<C>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, K, C> InvalidationHandler<E, K, C>
where
    E: Entity,
    K: CacheKeySource<E>,
    C: Cache + ?Sized,
{
    pub fn new(keys: K, cache: Arc<C>) -> Self {
        Self {
            keys,
            cache,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E, K, C> EventHandler<E> for InvalidationHandler<E, K, C>
where
    E: Entity,
    K: CacheKeySource<E>,
    C: Cache + ?Sized,
{
    async fn handle(&self, event: &DomainEvent<E>) -> Result<(), HandlerError> {
        let cleared = clear_cache(&*self.cache, self.keys.keys(event)).await?;
        tracing::debug!(
            entity_type = E::TYPE_NAME,
            entity_id = %event.entity().id(),
            kind = %event.kind(),
            cleared,
            "Invalidated cache entries"
        );
        Ok(())
    }
}

/// Registers one invalidation handler for every event kind of entity `E`.
pub fn subscribe_invalidation<E, K, C>(bus: &mut EventBus, keys: K, cache: Arc<C>)
where
    E: Entity,
    K: CacheKeySource<E> + 'static,
    C: Cache + ?Sized + 'static,
{
    let handler = Arc::new(InvalidationHandler::<E, K, C>::new(keys, cache));
    for kind in [EventKind::Created, EventKind::Updated, EventKind::Deleted] {
        bus.subscribe::<E, _>(kind, Arc::clone(&handler));
    }
}
