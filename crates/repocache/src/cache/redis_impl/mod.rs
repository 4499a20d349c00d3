//! Redis cache backend implementation.
//!
//! Provides a cache shared by every repository instance connected to the
//! same Redis server.

mod cache;
mod error;

pub use cache::RedisCache;
