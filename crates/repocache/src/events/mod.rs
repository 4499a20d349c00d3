//! Domain event dispatch and cache invalidation.
//!
//! Writes flow through the store repository's commit boundary:
//!
//! 1. the [`EventDispatcher`] drains pending events from the tracked entities
//! 2. the store commits the change set
//! 3. each event is published on the [`EventBus`]
//! 4. [`InvalidationHandler`]s derive cache keys and clear them
//!
//! Handler failures are logged and never undo the commit.

mod bus;
mod dispatcher;
mod invalidation;

pub use bus::{EventBus, EventHandler, HandlerError};
pub use dispatcher::EventDispatcher;
pub use invalidation::{
    clear_cache, subscribe_invalidation, CacheKeySource, EntityCacheKeys, InvalidationHandler,
};
