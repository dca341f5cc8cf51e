//! Data models for user records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// User role
///
/// Closed set. The capabilities a role grants live in
/// [`RoleCapabilityMap`](crate::user_auth::RoleCapabilityMap), not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    RegularUser,
    SuperUser,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::RegularUser, Role::SuperUser];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::RegularUser => "REGULAR_USER",
            Role::SuperUser => "SUPER_USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGULAR_USER" => Ok(Role::RegularUser),
            "SUPER_USER" => Ok(Role::SuperUser),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// User record as exposed outside the store (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserRecord {
    #[schema(example = "4f1c2a7e-3b9d-4e2f-9a61-0c5d8e7b1a23")]
    pub id: String,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Username or email match. Emails compare case-insensitively.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.username == identifier || self.email.eq_ignore_ascii_case(identifier)
    }

    /// Field of a new user that would clash with this record, if any.
    ///
    /// Usernames and emails share one login namespace, so a new username may
    /// not equal an existing email and a new email may not equal an existing
    /// username.
    pub fn identifier_conflict(&self, username: &str, email: &str) -> Option<&'static str> {
        if self.username == username || self.email.eq_ignore_ascii_case(username) {
            Some("username")
        } else if self.email.eq_ignore_ascii_case(email) || self.username.eq_ignore_ascii_case(email)
        {
            Some("email")
        } else {
            None
        }
    }
}

/// Input for [`UserStore::create_user`](super::UserStore::create_user)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// PHC-format hash, see [`hash_password`](crate::user_auth::hash_password)
    pub password_hash: String,
    pub role: Role,
}
