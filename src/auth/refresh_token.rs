/// Refresh Token Hashing
///
/// Session records store `bcrypt(sha256_hex(token))`, never the token itself.
/// The SHA-256 step keeps the bcrypt input at 64 bytes: a raw JWT exceeds
/// bcrypt's 72-byte limit, and two tokens for the same user share a long
/// prefix, so hashing the JWT directly would make them indistinguishable.

use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::store::SessionRecord;

fn prehash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Salted one-way hash of a refresh token
pub fn hash_refresh_token(token: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(prehash(token), cost)
        .map_err(|e| AppError::Internal(format!("Refresh token hashing failed: {}", e)))
}

/// Constant-time check of a presented token against a stored hash.
/// A malformed stored hash counts as a mismatch.
pub fn refresh_token_matches(token: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(prehash(token), stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored session hash is unreadable");
            false
        }
    }
}

/// First session whose hash matches `token`, checked in order.
pub fn find_matching_session(token: &str, sessions: Vec<SessionRecord>) -> Option<SessionRecord> {
    sessions
        .into_iter()
        .find(|s| refresh_token_matches(token, &s.token_hash))
}

pub async fn hash_refresh_token_blocking(token: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_refresh_token(&token, cost)).await?
}

pub async fn find_matching_session_blocking(
    token: String,
    sessions: Vec<SessionRecord>,
) -> Result<Option<SessionRecord>, AppError> {
    Ok(tokio::task::spawn_blocking(move || find_matching_session(&token, sessions)).await?)
}
