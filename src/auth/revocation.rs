/// Revocation Handler
///
/// Logout drops every session the user holds. Having nothing to drop is
/// still a successful logout.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Revocation {
    pub deleted_count: u64,
}

pub struct RevocationHandler {
    sessions: Arc<dyn SessionStore>,
}

impl RevocationHandler {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn revoke(&self, user_id: Uuid) -> Result<Revocation, AppError> {
        let deleted_count = self.sessions.delete_all_by_user(user_id).await?;

        if deleted_count == 0 {
            tracing::info!(user_id = %user_id, "Logout: no active sessions to delete");
        } else {
            tracing::info!(user_id = %user_id, deleted_count, "Logout: sessions deleted");
        }

        Ok(Revocation { deleted_count })
    }
}
