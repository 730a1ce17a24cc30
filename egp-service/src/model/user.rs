//! User entity, identifier and transport DTO

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage-generated user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw identifier
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw identifier
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Persisted user record
///
/// `id` is `None` until the record has been stored; the repository assigns
/// it on first `put`. The password is only ever held as a PHC hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Option<UserId>,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
}

impl User {
    /// Build an entity from a DTO
    ///
    /// Every field is replaced; a missing password clears the stored hash.
    pub fn from_dto(dto: UserDto, password_hash: Option<String>) -> Self {
        Self {
            id: dto.id,
            username: dto.username,
            email: dto.email,
            display_name: dto.display_name,
            password_hash,
        }
    }

    /// Replace the identifier
    #[must_use]
    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Transport shape for users
///
/// `password` only travels from caller to service. Responses are built from
/// stored [`User`]s through `From<User>`, which always leaves it `None`, so
/// a hash or password never appears in a response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserDto {
    /// Start a DTO with the required fields
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the plaintext password to be hashed on write
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            password: None,
        }
    }
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self::from(user.clone())
    }
}
