//! Typed reads on top of the raw [`Store`] contract.

use serde_json::Value;

use crate::entity::Entity;
use crate::specification::{apply, Specification};

use super::{RepositoryError, Result, Store};

/// Returns every entity of type `E` matching `specification`.
pub async fn query<E, S>(store: &S, specification: Option<&Specification<E>>) -> Result<Vec<E>>
where
    E: Entity,
    S: Store + ?Sized,
{
    let entities = store
        .documents(E::TYPE_NAME)
        .await?
        .into_iter()
        .map(decode::<E>)
        .collect::<Result<Vec<_>>>()?;
    Ok(apply(entities, specification))
}

/// Returns the entity with the given identity if it exists and matches `specification`.
pub async fn find_by_identity<E, S>(
    store: &S,
    id: &E::Id,
    specification: Option<&Specification<E>>,
) -> Result<Option<E>>
where
    E: Entity,
    S: Store + ?Sized,
{
    let Some(document) = store.document(E::TYPE_NAME, &id.to_string()).await? else {
        return Ok(None);
    };
    let entity = decode::<E>(document)?;
    Ok(apply(vec![entity], specification).pop())
}

/// Returns the stored entity with every navigation loaded, for write paths.
pub async fn find_stored<E, S>(store: &S, id: &E::Id) -> Result<Option<E>>
where
    E: Entity,
    S: Store + ?Sized,
{
    store
        .document(E::TYPE_NAME, &id.to_string())
        .await?
        .map(decode::<E>)
        .transpose()
}

fn decode<E: Entity>(document: Value) -> Result<E> {
    serde_json::from_value(document).map_err(|e| {
        RepositoryError::Serialization(format!("{} document: {e}", E::TYPE_NAME))
    })
}
