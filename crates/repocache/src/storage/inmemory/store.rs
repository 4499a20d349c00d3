//! In-memory document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use repocache_core::storage::{Mutation, Operation, RepositoryError, Result, Store, UniqueKey};

/// Owner lookup for a unique key: `(entity type, index, value) -> id`.
type UniqueIndex = HashMap<(&'static str, &'static str, String), String>;

#[derive(Debug)]
struct StoredDocument {
    body: Value,
    unique_keys: Vec<UniqueKey>,
}

/// State of one document before a mutation, restored on rollback.
type UndoEntry = (&'static str, String, Option<StoredDocument>);

#[derive(Debug, Default)]
struct Tables {
    documents: HashMap<&'static str, BTreeMap<String, StoredDocument>>,
    unique: UniqueIndex,
}

impl Tables {
    /// Applies one mutation, returning the document it replaced or removed.
    ///
    /// A failing mutation leaves the tables unchanged.
    fn apply(&mut self, mutation: Mutation) -> Result<Option<StoredDocument>> {
        let Mutation {
            operation,
            entity_type,
            id,
            document,
            unique_keys,
        } = mutation;

        let exists = self
            .documents
            .get(entity_type)
            .is_some_and(|table| table.contains_key(&id));

        match operation {
            Operation::Insert if exists => Err(RepositoryError::ConstraintViolation {
                entity_type,
                detail: format!("identity {id} already exists"),
            }),
            Operation::Update | Operation::Delete if !exists => {
                Err(RepositoryError::not_found(entity_type, id))
            }
            Operation::Insert | Operation::Update => {
                let body = document.ok_or_else(|| {
                    RepositoryError::QueryFailed(format!(
                        "{operation:?} of {entity_type} {id} without a document"
                    ))
                })?;
                self.check_unique_keys(entity_type, &id, &unique_keys)?;
                let previous = self.take(entity_type, &id);
                self.put(entity_type, id, StoredDocument { body, unique_keys });
                Ok(previous)
            }
            Operation::Delete => Ok(self.take(entity_type, &id)),
        }
    }

    /// Puts back the document an applied mutation replaced.
    fn restore(&mut self, (entity_type, id, previous): UndoEntry) {
        self.take(entity_type, &id);
        if let Some(document) = previous {
            self.put(entity_type, id, document);
        }
    }

    fn check_unique_keys(
        &self,
        entity_type: &'static str,
        id: &str,
        keys: &[UniqueKey],
    ) -> Result<()> {
        for key in keys {
            let slot = (entity_type, key.index, key.value.clone());
            if self.unique.get(&slot).is_some_and(|owner| owner != id) {
                return Err(RepositoryError::ConstraintViolation {
                    entity_type,
                    detail: format!("{} '{}' already taken", key.index, key.value),
                });
            }
        }
        Ok(())
    }

    /// Removes a document and releases its unique keys.
    fn take(&mut self, entity_type: &'static str, id: &str) -> Option<StoredDocument> {
        let stored = self.documents.get_mut(entity_type)?.remove(id)?;
        for key in &stored.unique_keys {
            self.unique
                .remove(&(entity_type, key.index, key.value.clone()));
        }
        Some(stored)
    }

    /// Stores a document and claims its unique keys.
    fn put(&mut self, entity_type: &'static str, id: String, document: StoredDocument) {
        for key in &document.unique_keys {
            self.unique
                .insert((entity_type, key.index, key.value.clone()), id.clone());
        }
        self.documents
            .entry(entity_type)
            .or_default()
            .insert(id, document);
    }
}

/// In-memory storage backend for testing.
///
/// Documents live in per-type `BTreeMap`s, so listings come back ordered by
/// identity. A commit applies its mutations in place and, if one fails,
/// undoes the ones already applied in reverse order. Data is not persisted
/// and is lost when the last clone of the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents of an entity type.
    pub async fn count(&self, entity_type: &str) -> usize {
        self.tables
            .read()
            .await
            .documents
            .get(entity_type)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn documents(&self, entity_type: &str) -> Result<Vec<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .get(entity_type)
            .map(|table| table.values().map(|d| d.body.clone()).collect())
            .unwrap_or_default())
    }

    async fn document(&self, entity_type: &str, id: &str) -> Result<Option<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .get(entity_type)
            .and_then(|table| table.get(id))
            .map(|d| d.body.clone()))
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mut undo: Vec<UndoEntry> = Vec::with_capacity(mutations.len());

        for mutation in mutations {
            let (entity_type, id) = (mutation.entity_type, mutation.id.clone());
            match tables.apply(mutation) {
                Ok(previous) => undo.push((entity_type, id, previous)),
                Err(err) => {
                    for entry in undo.into_iter().rev() {
                        tables.restore(entry);
                    }
                    return Err(err);
                }
            }
        }

        tracing::trace!(mutations = undo.len(), "Committed to in-memory store");
        Ok(())
    }
}
