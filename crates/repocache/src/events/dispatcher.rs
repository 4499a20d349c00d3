//! Commit-boundary event collection and publication.

use std::sync::Arc;

use repocache_core::storage::ChangeSet;
use repocache_core::PublishedEvent;

use super::EventBus;

/// Moves pending domain events from tracked entities onto the event bus.
///
/// Cloning is cheap; clones share the bus.
#[derive(Debug, Clone, Default)]
pub struct EventDispatcher {
    bus: Arc<EventBus>,
}

impl EventDispatcher {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Drains the pending events of every tracked entity, entity by entity
    /// and in raise order within each entity.
    ///
    /// Each entity's buffer is empty afterwards, so a retried commit never
    /// publishes the same event twice.
    pub fn collect(changes: &mut ChangeSet<'_>) -> Vec<PublishedEvent> {
        changes
            .entities_mut()
            .filter(|entity| entity.has_pending_events())
            .flat_map(|entity| entity.take_events())
            .collect()
    }

    /// Publishes `events` in order.
    ///
    /// Handler failures are logged as invalidation failures and otherwise
    /// ignored: the write they follow has already been committed.
    pub async fn publish(&self, events: Vec<PublishedEvent>) {
        for event in events {
            tracing::debug!(
                entity_type = event.entity_type(),
                entity_id = event.entity_id(),
                kind = %event.kind(),
                "Dispatching domain event"
            );

            for error in self.bus.publish(&event).await {
                tracing::warn!(
                    entity_type = event.entity_type(),
                    entity_id = event.entity_id(),
                    kind = %event.kind(),
                    error = %error,
                    "Cache invalidation failed"
                );
            }
        }
    }
}
