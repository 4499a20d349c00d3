//! Email lookups on top of the generic user repository.

use async_trait::async_trait;

use repocache_core::cache::Cache;
use repocache_core::storage::{query, Repository, Result, Store};
use repocache_core::{DomainEvent, Entity, Specification};

use crate::storage::{CachedRepository, StoreRepository};

use super::keys::{by_email_key, email_unique_key};
use super::{normalize_email, User};

/// Operation names of the user-specific reads, as used in cache keys.
pub mod operations {
    pub const GET_BY_EMAIL: &str = "get_by_email";
    pub const IS_EMAIL_UNIQUE: &str = "is_email_unique";
}

/// Repository of users with email lookups.
///
/// Emails are compared in their normalized form, see
/// [`normalize_email`](super::normalize_email).
#[async_trait]
pub trait UserRepository: Repository<User> {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// `true` when no user is registered with `email`.
    async fn is_email_unique(&self, email: &str) -> Result<bool>;

    /// Registers a user who signed up on their own: the new user is the
    /// acting principal of its own creation.
    async fn add_user(&self, user: User) -> Result<User>;
}

fn with_email(email: &str) -> Specification<User> {
    let email = normalize_email(email);
    Specification::new(move |user: &User| normalize_email(&user.email) == email)
}

#[async_trait]
impl<S> UserRepository for StoreRepository<User, S>
where
    S: Store + ?Sized + 'static,
{
    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let found = query(self.store(), Some(&with_email(email))).await?;
        Ok(found.into_iter().next())
    }

    async fn is_email_unique(&self, email: &str) -> Result<bool> {
        let found = query(self.store(), Some(&with_email(email))).await?;
        Ok(found.is_empty())
    }

    async fn add_user(&self, user: User) -> Result<User> {
        let acting_user = user.id;
        self.add(user, acting_user).await
    }
}

#[async_trait]
impl<R, C> UserRepository for CachedRepository<User, R, C>
where
    R: UserRepository + 'static,
    C: Cache + ?Sized + 'static,
{
    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.cached(&by_email_key(email), || self.inner().get_by_email(email))
            .await
    }

    async fn is_email_unique(&self, email: &str) -> Result<bool> {
        self.cached(&email_unique_key(email), || self.inner().is_email_unique(email))
            .await
    }

    async fn add_user(&self, mut user: User) -> Result<User> {
        user.raise_or_refresh(DomainEvent::Created(user.snapshot()));
        let added = self.inner().add_user(user).await?;
        self.write_through(&added).await;
        Ok(added)
    }
}
