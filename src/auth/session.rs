/// Session minting shared by login and refresh
///
/// Produces a signed token pair together with the session record that will
/// make its refresh token usable. Nothing is written here: the caller persists
/// the record, and only after that write succeeds is the pair handed out. A
/// request cancelled before the write therefore leaves no live token behind.

use chrono::Utc;
use std::sync::Arc;

use crate::auth::jwt::{TokenIssuer, TokenPair};
use crate::auth::refresh_token::hash_refresh_token_blocking;
use crate::error::AppError;
use crate::store::{NewSession, UserIdentity, UserProfile};

/// Token pair plus the record that backs its refresh token.
pub struct MintedSession {
    pub tokens: TokenPair,
    pub record: NewSession,
}

/// Successful login or refresh.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

pub struct SessionMinter {
    issuer: Arc<TokenIssuer>,
    session_hash_cost: u32,
}

impl SessionMinter {
    pub fn new(issuer: Arc<TokenIssuer>, session_hash_cost: u32) -> Self {
        Self {
            issuer,
            session_hash_cost,
        }
    }

    pub async fn mint(&self, identity: &UserIdentity) -> Result<MintedSession, AppError> {
        let tokens = self.issuer.issue(identity)?;
        let token_hash =
            hash_refresh_token_blocking(tokens.refresh_token.clone(), self.session_hash_cost)
                .await?;
        let lifetime = chrono::Duration::from_std(self.issuer.refresh_ttl())
            .map_err(|e| AppError::Internal(format!("Refresh TTL out of range: {}", e)))?;

        Ok(MintedSession {
            tokens,
            record: NewSession {
                user_id: identity.id,
                token_hash,
                expires_at: Utc::now() + lifetime,
            },
        })
    }
}
