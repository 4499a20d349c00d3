//! Pure functions classifying repository errors for presentation layers.
//!
//! The core never decides how a failure is rendered; it only says which of
//! the three user-visible classes an error belongs to.

use super::RepositoryError;

/// User-visible failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// "No such resource".
    NotFound,
    /// "Conflict".
    Conflict,
    /// Anything else.
    Failure,
}

/// Classifies a [`RepositoryError`].
///
/// # Examples
///
/// ```
/// use repocache_core::storage::{classify, FailureClass, RepositoryError};
///
/// let error = RepositoryError::not_found("User", "abc-123");
/// assert_eq!(classify(&error), FailureClass::NotFound);
/// ```
pub fn classify(error: &RepositoryError) -> FailureClass {
    match error {
        RepositoryError::NotFound { .. } => FailureClass::NotFound,
        RepositoryError::ConstraintViolation { .. } => FailureClass::Conflict,
        RepositoryError::StoreUnavailable(_)
        | RepositoryError::QueryFailed(_)
        | RepositoryError::Serialization(_)
        | RepositoryError::InvalidIdentity(_) => FailureClass::Failure,
    }
}

/// Maps a [`RepositoryError`] to the HTTP status code a transport layer would use.
///
/// - `NotFound` -> 404
/// - `ConstraintViolation` -> 409
/// - `StoreUnavailable` -> 503
/// - everything else -> 500
pub fn status_code_hint(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::ConstraintViolation { .. } => 409,
        RepositoryError::StoreUnavailable(_) => 503,
        RepositoryError::QueryFailed(_)
        | RepositoryError::Serialization(_)
        | RepositoryError::InvalidIdentity(_) => 500,
    }
}
