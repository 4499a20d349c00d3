//! Data-access and cache-invalidation core.
//!
//! Pure types and traits: typed identities, the base entity shape, domain
//! events, specifications, cache-key derivation and the store, repository
//! and cache contracts. Implementations live in the `repocache` crate.

extern crate self as repocache_core;

pub mod cache;
pub mod entity;
pub mod events;
pub mod identity;
pub mod specification;
pub mod storage;

#[cfg(test)]
mod testing;

pub use entity::{Audit, Entity, PendingEvents};
pub use events::{DomainEvent, EventKind, PublishedEvent};
pub use identity::{Identity, IdentityError, UserId};
pub use specification::Specification;

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use uuid::Uuid;
}
