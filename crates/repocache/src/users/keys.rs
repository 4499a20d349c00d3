//! Cache keys of the user-specific reads.

use std::sync::Arc;

use async_stream::stream;
use futures_util::stream::{BoxStream, StreamExt};

use repocache_core::cache::{entity_value_key, Cache};
use repocache_core::DomainEvent;

use crate::events::{subscribe_invalidation, CacheKeySource, EntityCacheKeys, EventBus};

use super::repository::operations;
use super::{normalize_email, User, UserSummary};

/// Key of `get_by_email` for `email`.
pub fn by_email_key(email: &str) -> String {
    entity_value_key::<User>(operations::GET_BY_EMAIL, normalize_email(email))
}

/// Key of `is_email_unique` for `email`.
pub fn email_unique_key(email: &str) -> String {
    entity_value_key::<User>(operations::IS_EMAIL_UNIQUE, normalize_email(email))
}

/// Email-scoped keys of the affected user, followed by the generic entity keys.
///
/// An `Updated` event only carries the new state: keys derived from a
/// previous email are left to expire with their TTL.
pub struct UserCacheKeys {
    base: EntityCacheKeys<User>,
}

impl UserCacheKeys {
    pub fn new() -> Self {
        Self {
            base: EntityCacheKeys::new().with_dto::<UserSummary>(),
        }
    }
}

impl Default for UserCacheKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheKeySource<User> for UserCacheKeys {
    fn keys<'a>(&'a self, event: &'a DomainEvent<User>) -> BoxStream<'a, String> {
        let email = &event.entity().email;
        Box::pin(stream! {
            yield by_email_key(email);
            yield email_unique_key(email);

            let mut base = self.base.keys(event);
            while let Some(key) = base.next().await {
                yield key;
            }
        })
    }
}

/// Subscribes user cache invalidation for created, updated and deleted users.
pub fn subscribe_user_invalidation<C>(bus: &mut EventBus, cache: Arc<C>)
where
    C: Cache + ?Sized + 'static,
{
    subscribe_invalidation::<User, _, _>(bus, UserCacheKeys::new(), cache);
}
