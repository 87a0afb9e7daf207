/// In-memory stores
///
/// Used by the `memory` storage backend and by the test suite. Each operation
/// takes the lock once, which gives the same per-statement atomicity the
/// Postgres backend gets from the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewSession, NewUser, SessionRecord, SessionStore, UserIdentity, UserStore};
use crate::error::StorageError;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserIdentity>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the active flag; there is no HTTP surface for this.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> bool {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserIdentity>, StorageError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, StorageError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<UserIdentity, StorageError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StorageError::Conflict(
                "username or email already exists".to_string(),
            ));
        }

        let identity = UserIdentity {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
        };
        users.insert(identity.id, identity.clone());
        Ok(identity)
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: NewSession) -> Result<SessionRecord, StorageError> {
        let record = session.into_record();
        self.sessions
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SessionRecord>, StorageError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, session_id: Uuid) -> Result<bool, StorageError> {
        Ok(self.sessions.write().await.remove(&session_id).is_some())
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id || !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn rotate(
        &self,
        old_session_id: Uuid,
        user_id: Uuid,
        replacement: NewSession,
    ) -> Result<Option<SessionRecord>, StorageError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&old_session_id) {
            Some(old) if old.user_id == user_id => {}
            _ => return Ok(None),
        }
        sessions.remove(&old_session_id);

        let record = replacement.into_record();
        sessions.insert(record.id, record.clone());
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;

    fn new_session(user_id: Uuid, offset_secs: i64) -> NewSession {
        NewSession {
            user_id,
            token_hash: format!("hash-{}", Uuid::new_v4()),
            expires_at: Utc::now() + chrono::Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_insert_allows_multiple_sessions_per_user() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();

        store.insert(new_session(user_id, 60)).await.unwrap();
        store.insert(new_session(user_id, 60)).await.unwrap();
        store.insert(new_session(Uuid::new_v4(), 60)).await.unwrap();

        assert_eq!(store.list_by_user(user_id).await.unwrap().len(), 2);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_delete_all_by_user_counts_and_is_idempotent() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        for _ in 0..3 {
            store.insert(new_session(user_id, 60)).await.unwrap();
        }
        store.insert(new_session(other, 60)).await.unwrap();

        assert_eq!(store.delete_all_by_user(user_id).await.unwrap(), 3);
        assert_eq!(store.delete_all_by_user(user_id).await.unwrap(), 0);
        assert_eq!(store.list_by_user(other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_single_session() {
        let store = InMemorySessionStore::new();
        let record = store.insert(new_session(Uuid::new_v4(), 60)).await.unwrap();

        assert!(store.delete(record.id).await.unwrap());
        assert!(!store.delete(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired_only_touches_expired_records_of_user() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert(new_session(user_id, -10)).await.unwrap();
        let live = store.insert(new_session(user_id, 60)).await.unwrap();
        store.insert(new_session(other, -10)).await.unwrap();

        let removed = store
            .delete_expired_for_user(user_id, Utc::now())
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.list_by_user(user_id).await.unwrap(), vec![live]);
        assert_eq!(store.list_by_user(other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rotate_is_single_use() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let old = store.insert(new_session(user_id, 60)).await.unwrap();

        let first = store
            .rotate(old.id, user_id, new_session(user_id, 60))
            .await
            .unwrap();
        let second = store
            .rotate(old.id, user_id, new_session(user_id, 60))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.list_by_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rotate_rejects_foreign_session() {
        let store = InMemorySessionStore::new();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let old = store.insert(new_session(owner, 60)).await.unwrap();

        let rotated = store
            .rotate(old.id, intruder, new_session(intruder, 60))
            .await
            .unwrap();

        assert!(rotated.is_none());
        assert_eq!(store.list_by_user(owner).await.unwrap(), vec![old]);
        assert!(store.list_by_user(intruder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_insert_rejects_duplicates() {
        let store = InMemoryUserStore::new();
        let user = NewUser {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
        };

        let created = store.insert(user.clone()).await.unwrap();
        assert!(created.is_active);
        assert!(matches!(
            store.insert(user).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(
            store.find_by_username("admin").await.unwrap().unwrap().id,
            created.id
        );
        assert!(store.find_by_username("Admin").await.unwrap().is_none());
    }
}
