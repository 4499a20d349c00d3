//! SQLite storage backend implementation.
//!
//! This module provides a SQLite-based implementation of the store contract
//! using `rusqlite` for synchronous operations and `tokio-rusqlite` for async
//! wrapping.

mod error;
mod schema;
mod store;

pub use store::SqliteStore;
