//! In-memory session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wardgate_core::result::AppResult;
use wardgate_core::types::UserId;
use wardgate_entity::session::Session;

use super::MemoryStore;
use crate::store::session::SessionStore;

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        self.enter().await;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&session.user_id) {
            return Err(wardgate_core::AppError::not_found(format!(
                "User {} not found",
                session.user_id
            )));
        }
        state
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> AppResult<Option<Session>> {
        self.enter().await;
        Ok(self.state.read().await.sessions.get(token_hash).cloned())
    }

    async fn touch(
        &self,
        token_hash: &str,
        last_activity: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.enter().await;
        let mut state = self.state.write().await;
        match state.sessions.get_mut(token_hash) {
            Some(session) => {
                if last_activity >= session.last_activity {
                    session.last_activity = last_activity;
                    session.expiry = expiry;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, token_hash: &str) -> AppResult<Option<Session>> {
        self.enter().await;
        Ok(self.state.write().await.sessions.remove(token_hash))
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Session>> {
        self.enter().await;
        let state = self.state.read().await;
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn delete_for_user(&self, user_id: UserId) -> AppResult<Vec<Session>> {
        self.enter().await;
        let mut state = self.state.write().await;
        let hashes: Vec<String> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.token_hash.clone())
            .collect();
        Ok(hashes
            .iter()
            .filter_map(|h| state.sessions.remove(h))
            .collect())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<Session>> {
        self.enter().await;
        let mut state = self.state.write().await;
        let hashes: Vec<String> = state
            .sessions
            .values()
            .filter(|s| s.is_expired_at(now))
            .map(|s| s.token_hash.clone())
            .collect();
        Ok(hashes
            .iter()
            .filter_map(|h| state.sessions.remove(h))
            .collect())
    }
}
