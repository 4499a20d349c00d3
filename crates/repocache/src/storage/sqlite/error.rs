//! SQLite error mapping.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` to `RepositoryError`
//! from `repocache_core::storage`.

use repocache_core::storage::RepositoryError;

/// Whether `err` is a primary key or UNIQUE constraint failure.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Maps a rusqlite error to a RepositoryError.
///
/// # Error Mapping
///
/// - Cannot open / busy / locked database → `RepositoryError::StoreUnavailable`
/// - All other errors → `RepositoryError::QueryFailed`
///
/// Constraint failures are mapped where the violated key is known, see
/// [`is_constraint_violation`].
fn map_rusqlite_error(err: &rusqlite::Error) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if matches!(
                sqlite_err.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            RepositoryError::StoreUnavailable(format!("SQLite database unavailable: {err}"))
        }
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

/// Maps a tokio_rusqlite error to a RepositoryError.
///
/// This is the main entry point for error mapping in async code.
pub fn map_tokio_rusqlite_error(err: tokio_rusqlite::Error) -> RepositoryError {
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => map_rusqlite_error(rusqlite_err),
        tokio_rusqlite::Error::ConnectionClosed | tokio_rusqlite::Error::Close(_) => {
            RepositoryError::StoreUnavailable("SQLite connection closed".to_string())
        }
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}
