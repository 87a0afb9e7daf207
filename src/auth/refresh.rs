/// Refresh Coordinator
///
/// Exchanges a refresh token for a new pair and retires the old session
/// (rotate-on-use). Outcomes:
/// - `Ok(IssuedSession)`: new pair issued, old record gone
/// - `Err(AppError::Auth(InvalidRefreshToken(_)))`: rejected, client must log in again
/// - any other `Err`: internal failure, nothing was rotated
///
/// Rotation is a conditional delete of the matched record by id. When two
/// requests race with the same token, exactly one delete succeeds; the other
/// is rejected as `AlreadyRotated`.

use chrono::Utc;
use std::sync::Arc;

use crate::auth::jwt::TokenIssuer;
use crate::auth::refresh_token::find_matching_session_blocking;
use crate::auth::session::{IssuedSession, SessionMinter};
use crate::error::{AppError, RefreshRejection};
use crate::store::{SessionStore, UserStore};

pub struct RefreshCoordinator {
    issuer: Arc<TokenIssuer>,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    minter: Arc<SessionMinter>,
}

impl RefreshCoordinator {
    pub fn new(
        issuer: Arc<TokenIssuer>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        minter: Arc<SessionMinter>,
    ) -> Self {
        Self {
            issuer,
            users,
            sessions,
            minter,
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedSession, AppError> {
        let claims = self
            .issuer
            .verify_refresh(refresh_token)
            .map_err(AppError::refresh_rejected)?;

        let user_id = claims
            .user_id()
            .ok_or(AppError::refresh_rejected(RefreshRejection::Malformed))?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::refresh_rejected(RefreshRejection::UnknownUser))?;
        if !user.is_active {
            return Err(AppError::refresh_rejected(RefreshRejection::InactiveUser));
        }

        let now = Utc::now();
        let live_sessions: Vec<_> = self
            .sessions
            .list_by_user(user.id)
            .await?
            .into_iter()
            .filter(|s| !s.is_expired(now))
            .collect();

        let Some(matched) =
            find_matching_session_blocking(refresh_token.to_string(), live_sessions).await?
        else {
            tracing::warn!(user_id = %user.id, "Refresh token has no live session");
            return Err(AppError::refresh_rejected(RefreshRejection::NoMatchingSession));
        };

        let minted = self.minter.mint(&user).await?;
        let replacement = self
            .sessions
            .rotate(matched.id, user.id, minted.record)
            .await?;

        let Some(replacement) = replacement else {
            tracing::warn!(
                user_id = %user.id,
                session_id = %matched.id,
                "Refresh token was already rotated by a concurrent request"
            );
            return Err(AppError::refresh_rejected(RefreshRejection::AlreadyRotated));
        };

        tracing::info!(
            user_id = %user.id,
            retired_session = %matched.id,
            session_id = %replacement.id,
            "Refresh token rotated"
        );

        Ok(IssuedSession {
            user: user.profile(),
            tokens: minted.tokens,
        })
    }
}
