//! Typed entity identifiers.
//!
//! Every entity type gets its own identifier newtype wrapping a random
//! 128-bit UUID. Identifiers are immutable, compare and hash by their value,
//! and serialize as the plain UUID string.

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when reconstituting an identity from external input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid identity '{value}': {reason}")]
    InvalidIdentity { value: String, reason: String },
}

/// Behaviour shared by all identifier newtypes.
pub trait Identity:
    Copy
    + Eq
    + Hash
    + Debug
    + Display
    + FromStr<Err = IdentityError>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Creates a fresh random identity.
    fn create_unique() -> Self;

    /// Wraps an existing value, used when reconstituting from storage.
    fn create(value: Uuid) -> Self;

    /// Returns the underlying value.
    fn value(&self) -> Uuid;

    /// Parses the string form of an identity.
    fn parse(value: &str) -> Result<Self, IdentityError> {
        Uuid::parse_str(value)
            .map(Self::create)
            .map_err(|e| IdentityError::InvalidIdentity {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Declares an identifier newtype implementing [`Identity`].
///
/// ```
/// repocache_core::identity! {
///     /// Identifier of an order.
///     pub struct OrderId;
/// }
///
/// use repocache_core::Identity;
/// let id = OrderId::create_unique();
/// assert_eq!(OrderId::parse(&id.to_string()), Ok(id));
/// ```
#[macro_export]
macro_rules! identity {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            $crate::__private::serde::Serialize,
            $crate::__private::serde::Deserialize,
        )]
        #[serde(transparent, crate = "repocache_core::__private::serde")]
        $vis struct $name($crate::__private::Uuid);

        impl $crate::Identity for $name {
            fn create_unique() -> Self {
                Self($crate::__private::Uuid::new_v4())
            }

            fn create(value: $crate::__private::Uuid) -> Self {
                Self(value)
            }

            fn value(&self) -> $crate::__private::Uuid {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::IdentityError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                <Self as $crate::Identity>::parse(s)
            }
        }
    };
}

identity! {
    /// Identity of a user, also used as the acting principal for audit stamps.
    pub struct UserId;
}
