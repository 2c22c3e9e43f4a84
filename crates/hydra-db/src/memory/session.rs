//! In-memory SessionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use hydra_core::{DomainError, RepoResult, Session, SessionRepository};

/// DashMap-backed session store
///
/// Sessions are keyed by ID with a secondary index from session token to ID.
/// Rows are kept after deactivation, like the PostgreSQL table.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<Uuid, Session>,
    by_token: DashMap<String, Uuid>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows, active or not
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Deactivate every active row matching `pred` and return their tokens
    fn deactivate_where<F>(&self, pred: F) -> Vec<String>
    where
        F: Fn(&Session) -> bool,
    {
        self.sessions
            .iter_mut()
            .filter_map(|mut entry| {
                let session = entry.value_mut();
                if session.is_active && pred(session) {
                    session.revoke();
                    Some(session.session_token.clone())
                } else {
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: &Session) -> RepoResult<()> {
        match self.by_token.entry(session.session_token.clone()) {
            Entry::Occupied(_) => Err(DomainError::SessionTokenExists),
            Entry::Vacant(slot) => {
                slot.insert(session.id);
                self.sessions.insert(session.id, session.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn find_by_token(&self, session_token: &str) -> RepoResult<Option<Session>> {
        let id = self.by_token.get(session_token).map(|id| *id);
        Ok(id.and_then(|id| self.sessions.get(&id).map(|s| s.clone())))
    }

    async fn find_active_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> RepoResult<Option<Session>> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.is_active && s.refresh_token == refresh_token)
            .map(|s| s.clone()))
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_usable_at(now))
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            if session.is_active {
                session.touch(at);
            }
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> RepoResult<bool> {
        Ok(match self.sessions.get_mut(&id) {
            Some(mut session) if session.is_active => {
                session.revoke();
                true
            }
            _ => false,
        })
    }

    async fn deactivate_by_token(&self, session_token: &str) -> RepoResult<bool> {
        let id = self.by_token.get(session_token).map(|id| *id);
        match id {
            Some(id) => self.deactivate(id).await,
            None => Ok(false),
        }
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> RepoResult<Vec<String>> {
        Ok(self.deactivate_where(|s| s.user_id == user_id))
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> RepoResult<Vec<String>> {
        Ok(self.deactivate_where(|s| s.is_expired_at(now)))
    }
}
