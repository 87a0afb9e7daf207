/// JWT Claims structure
///
/// The payload shared by access and refresh tokens: who the user is, plus the
/// standard RFC 7519 timing and issuer claims.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::store::{Role, UserIdentity};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Unique per token, so two pairs minted in the same second differ
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(identity: &UserIdentity, ttl: Duration, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            role: identity.role,
            jti: Uuid::new_v4().to_string(),
            exp: now + ttl.as_secs() as i64,
            iat: now,
            iss: issuer.to_string(),
        }
    }

    /// Extract user ID from claims
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            is_active: true,
        }
    }

    #[test]
    fn test_claims_creation() {
        let user = identity();
        let claims = Claims::new(&user, Duration::from_secs(900), "test");

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.user_id(), Some(user.id));
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn test_each_claim_set_has_distinct_jti() {
        let user = identity();
        let a = Claims::new(&user, Duration::from_secs(60), "test");
        let b = Claims::new(&user, Duration::from_secs(60), "test");

        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(&identity(), Duration::from_secs(60), "test");
        claims.sub = "invalid-uuid".to_string();

        assert!(claims.user_id().is_none());
    }
}
