//! Cache backend implementations.
//!
//! This module provides concrete implementations of the cache trait
//! defined in `repocache_core::cache`.
//!
//! # Feature Flags
//!
//! - `memory` (always built): in-process LRU cache with lazy TTL expiry
//! - `redis`: Redis cache shared by every process pointing at the same server

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
