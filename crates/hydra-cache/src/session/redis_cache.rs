//! Session snapshots in Redis
//!
//! Keys:
//! - `session:{token}` holds the JSON snapshot, with a TTL never past the
//!   session's expiry
//! - `session_id:{id}` holds the session token, with the same TTL. A pointer
//!   whose snapshot was invalidated reads as a miss.
//! - `user_sessions:{user_id}` is a set of the user's cached tokens, used for
//!   bulk invalidation

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::instrument;
use uuid::Uuid;

use hydra_core::{RepoResult, Session, SessionCache};

use super::entry_ttl;
use crate::pool::SharedRedisPool;

const SESSION_PREFIX: &str = "session:";
const SESSION_ID_PREFIX: &str = "session_id:";
const USER_SESSIONS_PREFIX: &str = "user_sessions:";

/// Redis-backed [`SessionCache`]
#[derive(Clone)]
pub struct RedisSessionCache {
    pool: SharedRedisPool,
    max_ttl: u64,
}

impl RedisSessionCache {
    /// Create a cache whose entries live at most `max_ttl` seconds
    #[must_use]
    pub fn new(pool: SharedRedisPool, max_ttl: u64) -> Self {
        Self { pool, max_ttl }
    }

    fn session_key(token: &str) -> String {
        format!("{SESSION_PREFIX}{token}")
    }

    fn session_id_key(session_id: Uuid) -> String {
        format!("{SESSION_ID_PREFIX}{session_id}")
    }

    fn user_key(user_id: Uuid) -> String {
        format!("{USER_SESSIONS_PREFIX}{user_id}")
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    #[instrument(skip(self, session_token))]
    async fn get(&self, session_token: &str) -> RepoResult<Option<Session>> {
        Ok(self.pool.get_json(&Self::session_key(session_token)).await?)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, session_id: Uuid) -> RepoResult<Option<Session>> {
        let token: Option<String> = {
            let mut conn = self.pool.get().await.map_err(crate::RedisPoolError::from)?;
            conn.get(Self::session_id_key(session_id))
                .await
                .map_err(crate::RedisPoolError::from)?
        };

        match token {
            Some(token) => self.get(&token).await,
            None => Ok(None),
        }
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn put(&self, session: &Session) -> RepoResult<()> {
        let Some(ttl) = entry_ttl(session, self.max_ttl, Utc::now()) else {
            return Ok(());
        };

        let payload = serde_json::to_string(session).map_err(crate::RedisPoolError::from)?;
        let user_key = Self::user_key(session.user_id);
        let mut conn = self.pool.get().await.map_err(crate::RedisPoolError::from)?;

        redis::pipe()
            .atomic()
            .set_ex(Self::session_key(&session.session_token), payload, ttl)
            .ignore()
            .set_ex(Self::session_id_key(session.id), &session.session_token, ttl)
            .ignore()
            .sadd(&user_key, &session.session_token)
            .ignore()
            .expire(&user_key, i64::try_from(self.max_ttl).unwrap_or(i64::MAX))
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(crate::RedisPoolError::from)?;

        Ok(())
    }

    #[instrument(skip(self, session_token))]
    async fn invalidate(&self, session_token: &str) -> RepoResult<()> {
        self.pool
            .delete_many(&[Self::session_key(session_token)])
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_user(&self, user_id: Uuid) -> RepoResult<()> {
        let user_key = Self::user_key(user_id);
        let mut conn = self.pool.get().await.map_err(crate::RedisPoolError::from)?;
        let tokens: Vec<String> = conn
            .smembers(&user_key)
            .await
            .map_err(crate::RedisPoolError::from)?;

        let mut keys: Vec<String> = tokens.iter().map(|t| Self::session_key(t)).collect();
        keys.push(user_key);
        let removed = self.pool.delete_many(&keys).await?;

        tracing::debug!(user_id = %user_id, removed, "Invalidated cached sessions");
        Ok(())
    }
}
