/// Credential Verifier
///
/// Checks a username/password pair against the identity store. Every failure
/// is reported as `InvalidCredentials`; only the logs say which part was wrong.

use std::sync::Arc;

use crate::auth::password::{hash_password, verify_password_blocking};
use crate::error::{AppError, AuthError};
use crate::store::{UserIdentity, UserStore};

pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
    /// Verified against when the username is unknown, so that path costs
    /// the same bcrypt work as a wrong password.
    decoy_hash: Option<String>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserStore>, password_hash_cost: u32) -> Self {
        let decoy_hash = match hash_password("decoy-password-never-matches", password_hash_cost) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    cost = password_hash_cost,
                    "Decoy hash unavailable; unknown usernames will skip bcrypt work"
                );
                None
            }
        };
        Self { users, decoy_hash }
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<UserIdentity, AppError> {
        let user = self.users.find_by_username(username).await?;

        let Some(user) = user else {
            if let Some(decoy) = &self.decoy_hash {
                let _ = verify_password_blocking(password.to_string(), decoy.clone()).await;
            }
            tracing::warn!(username = %username, "Login rejected: unknown username");
            return Err(AuthError::InvalidCredentials.into());
        };

        let password_valid =
            match verify_password_blocking(password.to_string(), user.password_hash.clone()).await
            {
                Ok(valid) => valid,
                Err(e) => {
                    tracing::error!(user_id = %user.id, error = %e, "Stored password hash unreadable");
                    return Err(AuthError::InvalidCredentials.into());
                }
            };
        if !password_valid {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Login rejected: account inactive");
            return Err(AuthError::InvalidCredentials.into());
        }

        tracing::debug!(user_id = %user.id, "Credentials verified");
        Ok(user)
    }
}
