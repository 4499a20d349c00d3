//! Storage, cache and event-bus implementations for `repocache_core`.
//!
//! - [`storage`]: the in-memory and SQLite stores, the store-backed
//!   repository and the cache-aside decorator
//! - [`cache`]: the in-memory LRU cache and the Redis cache
//! - [`events`]: the event bus, the commit-boundary dispatcher and cache
//!   invalidation handlers
//! - [`users`]: the `User` aggregate built on top of all of the above
//! - [`state`]: wiring of one store, one cache and the bus from [`Config`]

pub mod cache;
pub mod config;
pub mod events;
pub mod state;
pub mod storage;
pub mod users;

pub use config::{CacheSettings, Config};
pub use state::{AppState, Users};
