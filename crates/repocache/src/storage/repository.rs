//! Repository over a document [`Store`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use repocache_core::storage::{
    find_by_identity, find_stored, query, ChangeSet, Deleted, Dto, Repository, RepositoryError,
    Result, Store,
};
use repocache_core::{DomainEvent, Entity, Specification, UserId};

use crate::events::EventDispatcher;

/// CRUD for entity type `E` against a shared store.
///
/// Every write stamps audit fields, attaches the matching domain event and
/// goes through [`StoreRepository::save_changes`], which publishes the
/// drained events once the store has committed.
///
/// # Type Parameters
///
/// * `E` - The entity type
/// * `S` - The store implementation, `dyn Store` by default
pub struct StoreRepository<E, S: ?Sized = dyn Store> {
    store: Arc<S>,
    dispatcher: EventDispatcher,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S> StoreRepository<E, S>
where
    E: Entity,
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>, dispatcher: EventDispatcher) -> Self {
        Self {
            store,
            dispatcher,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Commits `changes` and publishes the domain events they carried.
    ///
    /// Events are drained before the commit and published only after it
    /// succeeded, so handlers never observe a write the store rejected.
    pub async fn save_changes(&self, mut changes: ChangeSet<'_>) -> Result<()> {
        let events = EventDispatcher::collect(&mut changes);
        let mutations = changes.into_mutations()?;

        self.store.commit(mutations).await?;
        self.dispatcher.publish(events).await;
        Ok(())
    }

    async fn load_stored(&self, id: &E::Id) -> Result<E> {
        find_stored::<E, S>(&*self.store, id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(E::TYPE_NAME, id))
    }
}

impl<E, S: ?Sized> Clone for StoreRepository<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dispatcher: self.dispatcher.clone(),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E, S> Repository<E> for StoreRepository<E, S>
where
    E: Entity,
    S: Store + ?Sized + 'static,
{
    async fn list(&self, specification: Option<&Specification<E>>) -> Result<Vec<E>> {
        query(&*self.store, specification).await
    }

    async fn get_by_id(
        &self,
        id: &E::Id,
        specification: Option<&Specification<E>>,
    ) -> Result<Option<E>> {
        find_by_identity(&*self.store, id, specification).await
    }

    async fn get_dto_by_id<D: Dto<E>>(&self, id: &E::Id) -> Result<Option<D>> {
        let entity = find_stored::<E, S>(&*self.store, id).await?;
        Ok(entity.as_ref().map(|e| D::from(e)))
    }

    async fn add(&self, mut entity: E, acting_user: UserId) -> Result<E> {
        entity.audit_mut().stamp_created(acting_user, Utc::now());
        entity.raise_or_refresh(DomainEvent::Created(entity.snapshot()));

        let mut changes = ChangeSet::new();
        changes.insert(&mut entity);
        self.save_changes(changes).await?;

        tracing::debug!(entity_type = E::TYPE_NAME, id = %entity.id(), "Entity added");
        Ok(entity)
    }

    async fn update(&self, mut entity: E, acting_user: UserId) -> Result<E> {
        let stored = self.load_stored(&entity.id()).await?;

        // creation fields come from the store; updated_at must pass the stored one
        *entity.audit_mut() = stored.audit().clone();
        entity.audit_mut().stamp_updated(acting_user, Utc::now());
        for navigation in E::NAVIGATIONS {
            entity.reload_from(navigation, &stored);
        }
        entity.raise_or_refresh(DomainEvent::Updated(entity.snapshot()));

        let mut changes = ChangeSet::new();
        changes.update(&mut entity);
        self.save_changes(changes).await?;

        tracing::debug!(entity_type = E::TYPE_NAME, id = %entity.id(), "Entity updated");
        Ok(entity)
    }

    async fn delete(&self, id: &E::Id) -> Result<Deleted> {
        let stored = self.load_stored(id).await?;
        self.remove(stored).await
    }

    async fn remove(&self, mut entity: E) -> Result<Deleted> {
        entity.raise_or_refresh(DomainEvent::Deleted(entity.snapshot()));

        let mut changes = ChangeSet::new();
        changes.mark_deleted(&mut entity);
        self.save_changes(changes).await?;

        tracing::debug!(entity_type = E::TYPE_NAME, id = %entity.id(), "Entity deleted");
        Ok(Deleted)
    }
}
