//! The `User` aggregate: entity, DTO projection, cache keys and the
//! specialized repository with email lookups.

mod dto;
mod keys;
mod model;
mod repository;

pub use dto::UserSummary;
pub use keys::{by_email_key, email_unique_key, subscribe_user_invalidation, UserCacheKeys};
pub use model::{normalize_email, RefreshToken, RefreshTokenId, User};
pub use repository::{operations, UserRepository};
