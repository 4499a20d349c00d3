//! SQLite document store.

use async_trait::async_trait;
use serde_json::Value;
use tokio_rusqlite::Connection;

use repocache_core::storage::{Mutation, Operation, RepositoryError, Result, Store, UniqueKey};

use super::error::{is_constraint_violation, map_tokio_rusqlite_error};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// A mutation with its document already encoded, ready to cross into the
/// connection thread.
struct EncodedMutation {
    operation: Operation,
    entity_type: &'static str,
    id: String,
    body: Option<String>,
    unique_keys: Vec<UniqueKey>,
}

impl EncodedMutation {
    fn encode(mutation: Mutation) -> Result<Self> {
        let body = mutation
            .document
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        Ok(Self {
            operation: mutation.operation,
            entity_type: mutation.entity_type,
            id: mutation.id,
            body,
            unique_keys: mutation.unique_keys,
        })
    }

    /// Applies the mutation inside an open transaction.
    ///
    /// The outer result carries SQLite failures; the inner one carries
    /// domain failures that must roll the transaction back.
    fn apply(
        &self,
        tx: &rusqlite::Transaction<'_>,
    ) -> tokio_rusqlite::Result<std::result::Result<(), RepositoryError>> {
        let (entity_type, id) = (self.entity_type, self.id.as_str());
        let body = self.body.as_deref().unwrap_or("null");

        match self.operation {
            Operation::Insert => {
                match tx.execute(schema::INSERT_DOCUMENT, (entity_type, id, body)) {
                    Ok(_) => {}
                    Err(e) if is_constraint_violation(&e) => {
                        return Ok(Err(RepositoryError::ConstraintViolation {
                            entity_type,
                            detail: format!("identity {id} already exists"),
                        }));
                    }
                    Err(e) => return Err(wrap_err(e)),
                }
                self.claim_unique_keys(tx)
            }
            Operation::Update => {
                let rows = tx
                    .execute(schema::UPDATE_DOCUMENT, (entity_type, id, body))
                    .map_err(wrap_err)?;
                if rows == 0 {
                    return Ok(Err(RepositoryError::not_found(entity_type, id)));
                }
                tx.execute(schema::DELETE_UNIQUE_KEYS, (entity_type, id))
                    .map_err(wrap_err)?;
                self.claim_unique_keys(tx)
            }
            Operation::Delete => {
                tx.execute(schema::DELETE_UNIQUE_KEYS, (entity_type, id))
                    .map_err(wrap_err)?;
                let rows = tx
                    .execute(schema::DELETE_DOCUMENT, (entity_type, id))
                    .map_err(wrap_err)?;
                if rows == 0 {
                    return Ok(Err(RepositoryError::not_found(entity_type, id)));
                }
                Ok(Ok(()))
            }
        }
    }

    fn claim_unique_keys(
        &self,
        tx: &rusqlite::Transaction<'_>,
    ) -> tokio_rusqlite::Result<std::result::Result<(), RepositoryError>> {
        for key in &self.unique_keys {
            let params = (self.entity_type, key.index, key.value.as_str(), self.id.as_str());
            match tx.execute(schema::INSERT_UNIQUE_KEY, params) {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => {
                    return Ok(Err(RepositoryError::ConstraintViolation {
                        entity_type: self.entity_type,
                        detail: format!("{} '{}' already taken", key.index, key.value),
                    }));
                }
                Err(e) => return Err(wrap_err(e)),
            }
        }
        Ok(Ok(()))
    }
}

fn decode(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// SQLite-based document store.
///
/// Each commit runs in one transaction, so a failing mutation leaves the
/// database untouched. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new store with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::StoreUnavailable(e.to_string()))?;

        Self::init_schema(&conn).await?;
        tracing::debug!(%path, "Opened SQLite store");

        Ok(Self { conn })
    }

    /// Creates a new store with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::StoreUnavailable(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(map_tokio_rusqlite_error)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn documents(&self, entity_type: &str) -> Result<Vec<Value>> {
        let entity_type = entity_type.to_string();

        let bodies = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_DOCUMENTS).map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&entity_type], |row| row.get::<_, String>(0))
                    .map_err(wrap_err)?;

                let mut bodies = Vec::new();
                for row_result in rows {
                    bodies.push(row_result.map_err(wrap_err)?);
                }
                Ok(bodies)
            })
            .await
            .map_err(map_tokio_rusqlite_error)?;

        bodies.iter().map(|body| decode(body)).collect()
    }

    async fn document(&self, entity_type: &str, id: &str) -> Result<Option<Value>> {
        let (entity_type, id) = (entity_type.to_string(), id.to_string());

        let body = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_DOCUMENT).map_err(wrap_err)?;
                match stmt.query_row([&entity_type, &id], |row| row.get::<_, String>(0)) {
                    Ok(body) => Ok(Some(body)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(map_tokio_rusqlite_error)?;

        body.as_deref().map(decode).transpose()
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<()> {
        let encoded = mutations
            .into_iter()
            .map(EncodedMutation::encode)
            .collect::<Result<Vec<_>>>()?;
        let count = encoded.len();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                for mutation in &encoded {
                    if let Err(e) = mutation.apply(&tx)? {
                        // dropping the transaction rolls it back
                        return Ok(Err(e));
                    }
                }
                tx.commit().map_err(wrap_err)?;
                Ok(Ok(()))
            })
            .await
            .map_err(map_tokio_rusqlite_error)??;

        tracing::trace!(mutations = count, "Committed to SQLite store");
        Ok(())
    }
}
