use thiserror::Error;

use crate::identity::IdentityError;

/// Errors that can occur during repository and store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} constraint violated: {detail}")]
    ConstraintViolation {
        entity_type: &'static str,
        detail: String,
    },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),
}

impl RepositoryError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
