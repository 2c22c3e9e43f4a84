//! Session snapshots in process memory

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use hydra_core::{RepoResult, Session, SessionCache};

use super::entry_ttl;

#[derive(Debug, Clone)]
struct Entry {
    session: Session,
    evict_at: Instant,
}

/// DashMap-backed [`SessionCache`] for single-instance deployments and tests
#[derive(Debug)]
pub struct MemorySessionCache {
    entries: DashMap<String, Entry>,
    /// Session ID to session token
    ids: DashMap<Uuid, String>,
    max_ttl: u64,
}

impl MemorySessionCache {
    /// Create a cache whose entries live at most `max_ttl` seconds
    #[must_use]
    pub fn new(max_ttl: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ids: DashMap::new(),
            max_ttl,
        }
    }

    /// Number of entries currently held, including ones past their deadline
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a snapshot is held for the token
    pub fn contains(&self, session_token: &str) -> bool {
        self.entries
            .get(session_token)
            .is_some_and(|e| e.evict_at > Instant::now())
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new(300)
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, session_token: &str) -> RepoResult<Option<Session>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(session_token)
            .map(|e| (e.evict_at > now).then(|| e.session.clone()));

        match hit {
            Some(Some(session)) => Ok(Some(session)),
            Some(None) => {
                self.entries.remove(session_token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn get_by_id(&self, session_id: Uuid) -> RepoResult<Option<Session>> {
        let Some(token) = self.ids.get(&session_id).map(|t| t.value().clone()) else {
            return Ok(None);
        };
        let hit = self.get(&token).await?;
        if hit.is_none() {
            self.ids.remove(&session_id);
        }
        Ok(hit)
    }

    async fn put(&self, session: &Session) -> RepoResult<()> {
        if let Some(ttl) = entry_ttl(session, self.max_ttl, Utc::now()) {
            self.ids.insert(session.id, session.session_token.clone());
            self.entries.insert(
                session.session_token.clone(),
                Entry {
                    session: session.clone(),
                    evict_at: Instant::now() + Duration::from_secs(ttl),
                },
            );
        }
        Ok(())
    }

    async fn invalidate(&self, session_token: &str) -> RepoResult<()> {
        if let Some((_, entry)) = self.entries.remove(session_token) {
            self.ids.remove(&entry.session.id);
        }
        Ok(())
    }

    async fn invalidate_user(&self, user_id: Uuid) -> RepoResult<()> {
        self.entries.retain(|_, e| e.session.user_id != user_id);
        self.ids.retain(|_, token| self.entries.contains_key(token.as_str()));
        Ok(())
    }
}
