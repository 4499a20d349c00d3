//! In-memory storage backend implementation.
//!
//! Provides a store implementation using `Arc<RwLock<_>>` for
//! thread-safe access. Useful for testing and the demo binary.

mod store;

pub use store::InMemoryStore;
