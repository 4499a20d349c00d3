//! Cached repository decorator.
//!
//! This module provides a decorator that wraps any repository with caching
//! behavior. The decorator implements the cache-aside pattern:
//!
//! - **Reads**: Check cache first, on miss fetch from repository and populate cache
//! - **Writes**: Attach the domain event, persist through the repository, write
//!   the single-entity key through
//! - **Invalidation**: Left to the handlers subscribed to the domain events
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! let cache = Arc::new(MemoryCache::new(10_000));
//! let users = Arc::new(StoreRepository::<User>::new(store, dispatcher));
//!
//! let cached = CachedRepository::new(users, cache, &CacheSettings::default());
//! ```

mod repository;

pub use repository::CachedRepository;
