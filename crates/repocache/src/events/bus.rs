//! Event bus routing published events to typed handlers.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use thiserror::Error;

use repocache_core::cache::CacheError;
use repocache_core::{DomainEvent, Entity, EventKind, PublishedEvent};

/// Errors a handler can report back to the bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Cache invalidation failed: {0}")]
    Invalidation(#[from] CacheError),
    #[error("Handler failed: {0}")]
    Failed(String),
}

/// Reacts to domain events of entity type `E`.
#[async_trait]
pub trait EventHandler<E: Entity>: Send + Sync {
    async fn handle(&self, event: &DomainEvent<E>) -> Result<(), HandlerError>;
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn handle(&self, event: &PublishedEvent) -> Result<(), HandlerError>;
}

struct Typed<E, H> {
    handler: Arc<H>,
    _entity: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E, H> ErasedHandler for Typed<E, H>
where
    E: Entity,
    H: EventHandler<E> + 'static,
{
    async fn handle(&self, event: &PublishedEvent) -> Result<(), HandlerError> {
        match event.downcast::<E>() {
            Some(typed) => self.handler.handle(typed).await,
            None => Ok(()),
        }
    }
}

/// Routes published events to the handlers registered for their
/// `(kind, entity type)` pair.
///
/// Subscriptions need `&mut self`; once the bus is shared behind an `Arc`
/// it can no longer change, so publishing takes no lock.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<(EventKind, TypeId), Vec<Arc<dyn ErasedHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind` on entity type `E`.
    pub fn subscribe<E, H>(&mut self, kind: EventKind, handler: Arc<H>)
    where
        E: Entity,
        H: EventHandler<E> + 'static,
    {
        tracing::debug!(entity_type = E::TYPE_NAME, %kind, "Subscribed event handler");
        self.handlers
            .entry((kind, TypeId::of::<E>()))
            .or_default()
            .push(Arc::new(Typed {
                handler,
                _entity: PhantomData::<fn() -> E>,
            }));
    }

    /// Number of handlers registered for `kind` on entity type `E`.
    pub fn handler_count<E: Entity>(&self, kind: EventKind) -> usize {
        self.handlers
            .get(&(kind, TypeId::of::<E>()))
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to every matching handler concurrently.
    ///
    /// Returns the errors of the handlers that failed; the others still ran.
    pub async fn publish(&self, event: &PublishedEvent) -> Vec<HandlerError> {
        let Some(handlers) = self
            .handlers
            .get(&(event.kind(), event.entity_type_id()))
        else {
            tracing::trace!(?event, "No handler registered");
            return Vec::new();
        };

        join_all(handlers.iter().map(|h| h.handle(event)))
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::User;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler<User> for CountingHandler {
        async fn handle(&self, _event: &DomainEvent<User>) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler<User> for FailingHandler {
        async fn handle(&self, _event: &DomainEvent<User>) -> Result<(), HandlerError> {
            Err(HandlerError::Failed("boom".to_string()))
        }
    }

    fn user() -> User {
        User::new("Ada", "ada@example.com")
    }

    #[tokio::test]
    async fn test_publish_routes_by_kind() {
        let created = Arc::new(CountingHandler::default());
        let deleted = Arc::new(CountingHandler::default());
        let mut bus = EventBus::new();
        bus.subscribe::<User, _>(EventKind::Created, created.clone());
        bus.subscribe::<User, _>(EventKind::Deleted, deleted.clone());

        let errors = bus
            .publish(&PublishedEvent::new(DomainEvent::Created(user())))
            .await;

        assert!(errors.is_empty());
        assert_eq!(created.calls.load(Ordering::SeqCst), 1);
        assert_eq!(deleted.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_runs_even_when_one_fails() {
        let counting = Arc::new(CountingHandler::default());
        let mut bus = EventBus::new();
        bus.subscribe::<User, _>(EventKind::Updated, Arc::new(FailingHandler));
        bus.subscribe::<User, _>(EventKind::Updated, counting.clone());

        let errors = bus
            .publish(&PublishedEvent::new(DomainEvent::Updated(user())))
            .await;

        assert_eq!(errors, vec![HandlerError::Failed("boom".to_string())]);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count::<User>(EventKind::Updated), 2);
    }

    #[tokio::test]
    async fn test_event_without_handler_is_ignored() {
        let bus = EventBus::new();

        let errors = bus
            .publish(&PublishedEvent::new(DomainEvent::Deleted(user())))
            .await;

        assert!(errors.is_empty());
        assert_eq!(bus.handler_count::<User>(EventKind::Deleted), 0);
    }
}
