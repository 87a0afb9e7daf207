/// Persistence layer
///
/// Repository traits for the two collections the auth core touches: user
/// identities (read-mostly) and refresh-token sessions. Each operation is a
/// single atomic statement at the backend; the auth core holds no locks of
/// its own.

mod memory;
mod postgres;

pub use memory::{InMemorySessionStore, InMemoryUserStore};
pub use postgres::{PgSessionStore, PgUserStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Author,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Author => "author",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "author" => Ok(Role::Author),
            other => Err(StorageError::Corrupt(format!("unknown role {:?}", other))),
        }
    }
}

/// A stored user, including the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

impl UserIdentity {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            is_active: self.is_active,
        }
    }
}

/// Public view of a user: no password hash, no sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

/// User to be created; `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// One issued refresh token. `token_hash` is a salted one-way hash, never the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    pub(crate) fn into_record(self) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            created_at: Utc::now(),
        }
    }
}

/// Identity store consumed by the auth core.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive match.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserIdentity>, StorageError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, StorageError>;

    /// Fails with `StorageError::Conflict` if username or email is taken.
    async fn insert(&self, user: NewUser) -> Result<UserIdentity, StorageError>;
}

/// Refresh-token session store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Appends a record. No deduplication: one user may hold many sessions.
    async fn insert(&self, session: NewSession) -> Result<SessionRecord, StorageError>;

    /// All records owned by the user, in no particular order.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SessionRecord>, StorageError>;

    /// Removes one record. Returns `false` if it did not exist.
    async fn delete(&self, session_id: Uuid) -> Result<bool, StorageError>;

    /// Removes every record the user owns and returns how many went.
    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64, StorageError>;

    /// Removes the user's records whose `expires_at` is not after `now`.
    async fn delete_expired_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Replaces a consumed session with its successor, atomically.
    ///
    /// Returns `None` without inserting anything when `old_session_id` is no
    /// longer present for `user_id`, i.e. another caller already rotated it.
    /// On error neither step takes effect.
    async fn rotate(
        &self,
        old_session_id: Uuid,
        user_id: Uuid,
        replacement: NewSession,
    ) -> Result<Option<SessionRecord>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Author.to_string(), "author");
        assert!("ADMIN".parse::<Role>().is_err());
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let user = UserIdentity {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "$2b$04$secret".to_string(),
            role: Role::Admin,
            is_active: true,
        };

        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["username"], "admin");
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn test_session_expiry_boundary() {
        let now = Utc::now();
        let record = NewSession {
            user_id: Uuid::new_v4(),
            token_hash: "hash".to_string(),
            expires_at: now,
        }
        .into_record();

        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - chrono::Duration::seconds(1)));
    }
}
