use serde::{Deserialize, Serialize};

use repocache_core::storage::Dto;
use repocache_core::UserId;

use super::User;

/// Public projection of a user, without credentials or audit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

impl Dto<User> for UserSummary {
    const NAME: &'static str = "UserSummary";
}
