//! Storage backend implementations.
//!
//! This module provides concrete implementations of the store and repository
//! traits defined in `repocache_core::storage`.
//!
//! # Feature Flags
//!
//! - in-memory store (always built): documents in process memory
//! - `sqlite`: SQLite document store using `rusqlite` and `tokio-rusqlite`
//!
//! # Layering
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
//! let users = Arc::new(StoreRepository::<User>::new(store, dispatcher));
//! let cached = CachedRepository::new(users, cache, &CacheSettings::default());
//! ```

pub mod cached;
pub mod inmemory;
mod repository;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cached::CachedRepository;
pub use inmemory::InMemoryStore;
pub use repository::StoreRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
