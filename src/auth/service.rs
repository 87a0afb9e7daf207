/// Authentication service
///
/// Wires the credential verifier, token issuer, session store, refresh
/// coordinator and revocation handler together once at startup. Handlers get
/// it through `web::Data<AuthService>`; nothing here is global.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::credentials::CredentialVerifier;
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::hash_password_blocking;
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::revocation::{Revocation, RevocationHandler};
use crate::auth::session::{IssuedSession, SessionMinter};
use crate::configuration::SecuritySettings;
use crate::error::AppError;
use crate::store::{NewUser, Role, SessionStore, UserProfile, UserStore};

pub struct AuthService {
    issuer: Arc<TokenIssuer>,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    credentials: CredentialVerifier,
    minter: Arc<SessionMinter>,
    refresher: RefreshCoordinator,
    revocation: RevocationHandler,
    password_hash_cost: u32,
}

impl AuthService {
    pub fn new(
        issuer: Arc<TokenIssuer>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        security: &SecuritySettings,
    ) -> Self {
        let minter = Arc::new(SessionMinter::new(
            issuer.clone(),
            security.session_hash_cost,
        ));

        Self {
            credentials: CredentialVerifier::new(users.clone(), security.password_hash_cost),
            refresher: RefreshCoordinator::new(
                issuer.clone(),
                users.clone(),
                sessions.clone(),
                minter.clone(),
            ),
            revocation: RevocationHandler::new(sessions.clone()),
            minter,
            issuer,
            users,
            sessions,
            password_hash_cost: security.password_hash_cost,
        }
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    /// Verify credentials, then open a new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AppError> {
        let user = self.credentials.verify(username, password).await?;

        match self
            .sessions
            .delete_expired_for_user(user.id, Utc::now())
            .await
        {
            Ok(0) => {}
            Ok(pruned) => tracing::debug!(user_id = %user.id, pruned, "Expired sessions pruned"),
            Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Session pruning failed"),
        }

        let minted = self.minter.mint(&user).await?;
        let session = self.sessions.insert(minted.record).await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "Login successful");

        Ok(IssuedSession {
            user: user.profile(),
            tokens: minted.tokens,
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedSession, AppError> {
        self.refresher.refresh(refresh_token).await
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<Revocation, AppError> {
        self.revocation.revoke(user_id).await
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| user.profile())
            .ok_or_else(|| AppError::NotFound(format!("User with ID {}", user_id)))
    }

    /// Create a user with a bcrypt-hashed password.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserProfile, AppError> {
        let password_hash =
            hash_password_blocking(password.to_string(), self.password_hash_cost).await?;

        let user = self
            .users
            .insert(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user.profile())
    }

    pub async fn user_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.users.find_by_username(username).await?.is_some())
    }
}
