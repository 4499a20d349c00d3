//! Deterministic cache-key derivation.
//!
//! Keys are built only from the entity type name, an operation name and an
//! optional lookup value, so any component can rebuild the exact key the
//! cached repository wrote without calling it:
//!
//! - operation-scoped: `{EntityTypeName}:{OperationName}`
//! - value-scoped: `{EntityTypeName}:{OperationName}:{Value}`

use std::fmt::Display;

use crate::entity::Entity;

/// Operation names of the generic repository reads.
pub mod operations {
    pub const LIST: &str = "list";
    pub const GET_BY_ID: &str = "get_by_id";
    pub const GET_DTO_BY_ID: &str = "get_dto_by_id";
}

/// Returns the operation-scoped key `{EntityTypeName}:{operation}`.
pub fn entity_key<E: Entity>(operation: &str) -> String {
    format!("{}:{}", E::TYPE_NAME, operation)
}

/// Returns the value-scoped key `{EntityTypeName}:{operation}:{value}`.
pub fn entity_value_key<E: Entity>(operation: &str, value: impl Display) -> String {
    format!("{}:{}:{}", E::TYPE_NAME, operation, value)
}

/// Returns the key of the unfiltered collection read.
pub fn list_key<E: Entity>() -> String {
    entity_key::<E>(operations::LIST)
}

/// Returns the key of the unfiltered single-entity read.
pub fn by_id_key<E: Entity>(id: &E::Id) -> String {
    entity_value_key::<E>(operations::GET_BY_ID, id)
}

/// Returns the key of a DTO projection read, e.g. `User:get_dto_by_id:UserSummary:{id}`.
pub fn dto_key<E: Entity>(dto_name: &str, id: &E::Id) -> String {
    entity_value_key::<E>(&format!("{}:{}", operations::GET_DTO_BY_ID, dto_name), id)
}
