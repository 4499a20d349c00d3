//! Unit of work handed to a store commit.
//!
//! A [`ChangeSet`] borrows the entities being written so that the commit
//! boundary can drain their pending domain events in place before the
//! mutations are finalized.

use serde_json::Value;

use crate::entity::Entity;
use crate::events::PublishedEvent;

use super::{RepositoryError, Result};

/// What a commit does with one tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

/// A store-level unique index entry, e.g. `("email", "a@x.com")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub index: &'static str,
    pub value: String,
}

/// A serialized write, as applied by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub operation: Operation,
    pub entity_type: &'static str,
    pub id: String,
    /// Full document for inserts and updates, `None` for deletes.
    pub document: Option<Value>,
    pub unique_keys: Vec<UniqueKey>,
}

/// Type-erased view of an entity tracked by a [`ChangeSet`].
pub trait TrackedEntity: Send {
    fn entity_type(&self) -> &'static str;

    fn entity_id(&self) -> String;

    fn has_pending_events(&self) -> bool;

    /// Takes the pending events, type-erased for publication.
    fn take_events(&mut self) -> Vec<PublishedEvent>;

    fn to_mutation(&self, operation: Operation) -> Result<Mutation>;
}

impl<E: Entity> TrackedEntity for E {
    fn entity_type(&self) -> &'static str {
        E::TYPE_NAME
    }

    fn entity_id(&self) -> String {
        self.id().to_string()
    }

    fn has_pending_events(&self) -> bool {
        !self.pending_events().is_empty()
    }

    fn take_events(&mut self) -> Vec<PublishedEvent> {
        self.pending_events_mut()
            .drain()
            .into_iter()
            .map(PublishedEvent::new)
            .collect()
    }

    fn to_mutation(&self, operation: Operation) -> Result<Mutation> {
        let id = self.id().to_string();
        let (document, unique_keys) = match operation {
            Operation::Delete => (None, Vec::new()),
            Operation::Insert | Operation::Update => {
                let document = serde_json::to_value(self)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
                let unique_keys = self
                    .unique_keys()
                    .into_iter()
                    .map(|(index, value)| UniqueKey { index, value })
                    .collect();
                (Some(document), unique_keys)
            }
        };

        Ok(Mutation {
            operation,
            entity_type: E::TYPE_NAME,
            id,
            document,
            unique_keys,
        })
    }
}

/// Entities modified in one logical write.
#[derive(Default)]
pub struct ChangeSet<'a> {
    tracked: Vec<(Operation, &'a mut (dyn TrackedEntity + 'a))>,
}

impl<'a> ChangeSet<'a> {
    pub fn new() -> Self {
        Self {
            tracked: Vec::new(),
        }
    }

    pub fn insert<E: Entity>(&mut self, entity: &'a mut E) {
        self.tracked.push((Operation::Insert, entity));
    }

    pub fn update<E: Entity>(&mut self, entity: &'a mut E) {
        self.tracked.push((Operation::Update, entity));
    }

    pub fn mark_deleted<E: Entity>(&mut self, entity: &'a mut E) {
        self.tracked.push((Operation::Delete, entity));
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Tracked entities in the order they were added.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut (dyn TrackedEntity + 'a)> + '_ {
        self.tracked.iter_mut().map(|(_, entity)| &mut **entity)
    }

    /// Serializes every tracked entity, releasing the borrows.
    pub fn into_mutations(self) -> Result<Vec<Mutation>> {
        self.tracked
            .into_iter()
            .map(|(operation, entity)| entity.to_mutation(operation))
            .collect()
    }
}
