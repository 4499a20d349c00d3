//! Cache-aside decorator over any [`Repository`].

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use repocache_core::cache::{by_id_key, dto_key, get_or_populate, list_key, put, Cache};
use repocache_core::specification::apply;
use repocache_core::storage::{Deleted, Dto, Repository, RepositoryError, Result};
use repocache_core::{DomainEvent, Entity, Specification, UserId};

use crate::config::CacheSettings;

/// Cached repository decorator.
///
/// Implements the cache-aside pattern:
/// - **Reads** without a specification: check cache first, on miss fetch from
///   the inner repository and populate the cache. Absent results are cached
///   too.
/// - **Reads** with a specification: always delegate, never touch the cache.
/// - **Writes**: attach the domain event, delegate, then write the
///   `get_by_id` key of the written entity.
///
/// Every entry written by one instance uses the same TTL, drawn once at
/// construction from [`CacheSettings`].
///
/// # Type Parameters
///
/// * `E` - The entity type
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
pub struct CachedRepository<E, R, C: ?Sized> {
    inner: Arc<R>,
    cache: Arc<C>,
    ttl: Duration,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R, C> CachedRepository<E, R, C>
where
    E: Entity,
    R: Repository<E>,
    C: Cache + ?Sized,
{
    /// Creates a cached repository with a jittered TTL.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying repository to cache
    /// * `cache` - The cache shared with the invalidation handlers
    /// * `settings` - Base TTL and jitter bound
    pub fn new(inner: Arc<R>, cache: Arc<C>, settings: &CacheSettings) -> Self {
        let ttl = settings.jittered_ttl();
        tracing::debug!(entity_type = E::TYPE_NAME, ttl = ?ttl, "Cached repository created");
        Self::with_ttl(inner, cache, ttl)
    }

    /// Creates a cached repository with an exact TTL.
    pub fn with_ttl(inner: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            inner,
            cache,
            ttl,
            _entity: PhantomData,
        }
    }

    /// The TTL of every entry this instance writes.
    pub fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Cache-aside read under `key`.
    pub(crate) async fn cached<T, F, Fut>(&self, key: &str, populate: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        get_or_populate(&*self.cache, key, self.ttl, populate).await
    }

    /// Writes `entity` under its `get_by_id` key, shaped like an unfiltered read.
    pub(crate) async fn write_through(&self, entity: &E) {
        let key = by_id_key::<E>(&entity.id());
        let shaped = apply(vec![entity.snapshot()], None);
        put(&*self.cache, &key, &shaped.first(), self.ttl).await;
        tracing::trace!(%key, "Wrote entity through to cache");
    }
}

#[async_trait]
impl<E, R, C> Repository<E> for CachedRepository<E, R, C>
where
    E: Entity,
    R: Repository<E> + 'static,
    C: Cache + ?Sized + 'static,
{
    async fn list(&self, specification: Option<&Specification<E>>) -> Result<Vec<E>> {
        if specification.is_some() {
            tracing::trace!(entity_type = E::TYPE_NAME, "Specification given, bypassing cache");
            return self.inner.list(specification).await;
        }

        self.cached(&list_key::<E>(), || self.inner.list(None)).await
    }

    async fn get_by_id(
        &self,
        id: &E::Id,
        specification: Option<&Specification<E>>,
    ) -> Result<Option<E>> {
        if specification.is_some() {
            tracing::trace!(
                entity_type = E::TYPE_NAME,
                %id,
                "Specification given, bypassing cache"
            );
            return self.inner.get_by_id(id, specification).await;
        }

        self.cached(&by_id_key::<E>(id), || self.inner.get_by_id(id, None))
            .await
    }

    async fn get_dto_by_id<D: Dto<E>>(&self, id: &E::Id) -> Result<Option<D>> {
        self.cached(&dto_key::<E>(D::NAME, id), || self.inner.get_dto_by_id::<D>(id))
            .await
    }

    async fn add(&self, mut entity: E, acting_user: UserId) -> Result<E> {
        entity.raise_or_refresh(DomainEvent::Created(entity.snapshot()));
        let added = self.inner.add(entity, acting_user).await?;
        self.write_through(&added).await;
        Ok(added)
    }

    async fn update(&self, mut entity: E, acting_user: UserId) -> Result<E> {
        entity.raise_or_refresh(DomainEvent::Updated(entity.snapshot()));
        let updated = self.inner.update(entity, acting_user).await?;
        self.write_through(&updated).await;
        Ok(updated)
    }

    async fn delete(&self, id: &E::Id) -> Result<Deleted> {
        let entity = self
            .inner
            .get_by_id(id, None)
            .await?
            .ok_or_else(|| RepositoryError::not_found(E::TYPE_NAME, id))?;
        self.remove(entity).await
    }

    async fn remove(&self, mut entity: E) -> Result<Deleted> {
        entity.raise_or_refresh(DomainEvent::Deleted(entity.snapshot()));
        self.inner.remove(entity).await
    }
}
