use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use repocache_core::{identity, Audit, Entity, Identity, PendingEvents, UserId};

identity! {
    /// Identity of a refresh token.
    pub struct RefreshTokenId;
}

/// Canonical form of an email address, used for storage, lookups and keys.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A long-lived credential issued to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Issues a new random token valid for `lifetime`.
    pub fn issue(lifetime: Duration) -> Self {
        Self {
            id: RefreshTokenId::create_unique(),
            token: Uuid::new_v4().simple().to_string(),
            expires_at: Utc::now() + lifetime,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A registered user.
///
/// `refresh_tokens` is a navigation: it is `None` unless the read asked for
/// it with `Specification::include(User::REFRESH_TOKENS)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub refresh_tokens: Option<Vec<RefreshToken>>,
    #[serde(default)]
    pub audit: Audit,
    #[serde(skip)]
    events: PendingEvents<User>,
}

impl User {
    pub const REFRESH_TOKENS: &'static str = "refresh_tokens";

    pub fn new(name: impl Into<String>, email: &str) -> Self {
        Self {
            id: UserId::create_unique(),
            name: name.into(),
            email: normalize_email(email),
            refresh_tokens: Some(Vec::new()),
            audit: Audit::default(),
            events: PendingEvents::default(),
        }
    }

    /// The first token that has not expired yet, if tokens are loaded.
    pub fn active_refresh_token(&self, now: DateTime<Utc>) -> Option<&RefreshToken> {
        self.refresh_tokens
            .as_deref()?
            .iter()
            .find(|t| !t.is_expired(now))
    }

    /// Adds a token to the loaded token list.
    ///
    /// Returns `false` and leaves the user unchanged when the tokens were not
    /// loaded.
    pub fn add_refresh_token(&mut self, token: RefreshToken) -> bool {
        match self.refresh_tokens.as_mut() {
            Some(tokens) => {
                tokens.push(token);
                true
            }
            None => false,
        }
    }
}

impl Entity for User {
    type Id = UserId;
    const TYPE_NAME: &'static str = "User";
    const NAVIGATIONS: &'static [&'static str] = &[User::REFRESH_TOKENS];

    fn id(&self) -> UserId {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn pending_events(&self) -> &PendingEvents<Self> {
        &self.events
    }

    fn pending_events_mut(&mut self) -> &mut PendingEvents<Self> {
        &mut self.events
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("email", normalize_email(&self.email))]
    }

    fn unload(&mut self, navigation: &str) {
        if navigation == User::REFRESH_TOKENS {
            self.refresh_tokens = None;
        }
    }

    fn reload_from(&mut self, navigation: &str, stored: &Self) {
        if navigation == User::REFRESH_TOKENS && self.refresh_tokens.is_none() {
            self.refresh_tokens = stored.refresh_tokens.clone();
        }
    }
}
