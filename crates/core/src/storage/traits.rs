use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::entity::Entity;
use crate::identity::UserId;
use crate::specification::Specification;

use super::{Mutation, Result};

/// Backing store holding entities as JSON documents partitioned by type name.
///
/// Reads return raw documents; typed querying lives in
/// [`query`](super::query) and [`find_by_identity`](super::find_by_identity).
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns every document of an entity type.
    async fn documents(&self, entity_type: &str) -> Result<Vec<Value>>;

    /// Returns one document by its identity, if present.
    async fn document(&self, entity_type: &str, id: &str) -> Result<Option<Value>>;

    /// Applies all mutations atomically.
    ///
    /// Fails with `NotFound` when an update or delete targets a missing
    /// document and with `ConstraintViolation` when an insert reuses an
    /// identity or a unique key is already taken. Nothing is applied on
    /// failure.
    async fn commit(&self, mutations: Vec<Mutation>) -> Result<()>;
}

/// Marker returned by a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deleted;

/// A read-only projection of an entity.
pub trait Dto<E: Entity>:
    for<'a> From<&'a E> + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Stable name used in cache keys.
    const NAME: &'static str;
}

/// CRUD operations over one entity type.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Returns all entities matching `specification`, or all entities.
    async fn list(&self, specification: Option<&Specification<E>>) -> Result<Vec<E>>;

    /// Returns the entity with the given identity, further filtered/shaped by
    /// `specification`. Absence is not an error.
    async fn get_by_id(
        &self,
        id: &E::Id,
        specification: Option<&Specification<E>>,
    ) -> Result<Option<E>>;

    /// Returns the projection `D` of the entity with the given identity.
    async fn get_dto_by_id<D: Dto<E>>(&self, id: &E::Id) -> Result<Option<D>>;

    /// Stamps creation by `acting_user`, persists and returns the entity.
    async fn add(&self, entity: E, acting_user: UserId) -> Result<E>;

    /// Stamps modification by `acting_user`, persists and returns the entity.
    async fn update(&self, entity: E, acting_user: UserId) -> Result<E>;

    /// Deletes the entity with the given identity.
    ///
    /// Fails with `NotFound` when no such entity exists, including when it
    /// was already deleted.
    async fn delete(&self, id: &E::Id) -> Result<Deleted>;

    /// Deletes an entity the caller already loaded, dispatching any events
    /// already pending on it.
    async fn remove(&self, entity: E) -> Result<Deleted>;
}
