//! Domain events raised by entity mutations.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// The three kinds of state change an entity can undergo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// A state change of one entity.
///
/// `Deleted` carries the entity as it was immediately before removal.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent<E> {
    Created(E),
    Updated(E),
    Deleted(E),
}

impl<E> DomainEvent<E> {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::Created(_) => EventKind::Created,
            DomainEvent::Updated(_) => EventKind::Updated,
            DomainEvent::Deleted(_) => EventKind::Deleted,
        }
    }

    /// The affected entity (the pre-removal snapshot for `Deleted`).
    pub fn entity(&self) -> &E {
        match self {
            DomainEvent::Created(e) | DomainEvent::Updated(e) | DomainEvent::Deleted(e) => e,
        }
    }
}

/// A domain event with its entity type erased, as carried by the event bus.
///
/// Handlers registered for a concrete entity type get the typed event back
/// through [`PublishedEvent::downcast`].
#[derive(Clone)]
pub struct PublishedEvent {
    kind: EventKind,
    entity_type: &'static str,
    entity_id: String,
    type_id: TypeId,
    payload: Arc<dyn Any + Send + Sync>,
}

impl PublishedEvent {
    pub fn new<E: Entity>(event: DomainEvent<E>) -> Self {
        Self {
            kind: event.kind(),
            entity_type: E::TYPE_NAME,
            entity_id: event.entity().id().to_string(),
            type_id: TypeId::of::<E>(),
            payload: Arc::new(event),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Type id of the entity the event refers to.
    pub fn entity_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the typed event when it refers to an entity of type `E`.
    pub fn downcast<E: Entity>(&self) -> Option<&DomainEvent<E>> {
        self.payload.downcast_ref::<DomainEvent<E>>()
    }
}

impl fmt::Debug for PublishedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishedEvent")
            .field("kind", &self.kind)
            .field("entity_type", &self.entity_type)
            .field("entity_id", &self.entity_id)
            .finish_non_exhaustive()
    }
}
