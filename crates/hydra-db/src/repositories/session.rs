//! PostgreSQL implementation of SessionRepository
//!
//! Rows are never deleted. Every deactivating statement is guarded by
//! `is_active = TRUE`, so a revoked row is never reactivated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use hydra_core::{DomainError, RepoResult, Session, SessionRepository};

use crate::models::SessionModel;

use super::error::{map_db_error, map_unique_violation};

/// PostgreSQL implementation of SessionRepository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    #[instrument(skip(self, session), fields(session_id = %session.id, user_id = %session.user_id))]
    async fn create(&self, session: &Session) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_sessions (
                id, user_id, session_token, refresh_token, device_info, ip_address,
                user_agent, expires_at, last_used_at, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.session_token)
        .bind(&session.refresh_token)
        .bind(Json(&session.device_info))
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .bind(session.last_used_at)
        .bind(session.is_active)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::SessionTokenExists))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Session>> {
        let result = sqlx::query_as::<_, SessionModel>(
            r"
            SELECT id, user_id, session_token, refresh_token, device_info, ip_address,
                   user_agent, expires_at, last_used_at, is_active, created_at
            FROM user_sessions
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Session::from))
    }

    #[instrument(skip(self, session_token))]
    async fn find_by_token(&self, session_token: &str) -> RepoResult<Option<Session>> {
        let result = sqlx::query_as::<_, SessionModel>(
            r"
            SELECT id, user_id, session_token, refresh_token, device_info, ip_address,
                   user_agent, expires_at, last_used_at, is_active, created_at
            FROM user_sessions
            WHERE session_token = $1
            ",
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Session::from))
    }

    #[instrument(skip(self, refresh_token))]
    async fn find_active_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> RepoResult<Option<Session>> {
        let result = sqlx::query_as::<_, SessionModel>(
            r"
            SELECT id, user_id, session_token, refresh_token, device_info, ip_address,
                   user_agent, expires_at, last_used_at, is_active, created_at
            FROM user_sessions
            WHERE refresh_token = $1 AND is_active = TRUE
            ",
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Session::from))
    }

    #[instrument(skip(self))]
    async fn list_active_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionModel>(
            r"
            SELECT id, user_id, session_token, refresh_token, device_info, ip_address,
                   user_agent, expires_at, last_used_at, is_active, created_at
            FROM user_sessions
            WHERE user_id = $1 AND is_active = TRUE AND expires_at > NOW()
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Session::from).collect())
    }

    #[instrument(skip(self))]
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        // expires_at is never written after insert
        sqlx::query(
            r"
            UPDATE user_sessions
            SET last_used_at = GREATEST(last_used_at, $2)
            WHERE id = $1 AND is_active = TRUE
            ",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn deactivate(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = FALSE WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, session_token))]
    async fn deactivate_by_token(&self, session_token: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE user_sessions SET is_active = FALSE
            WHERE session_token = $1 AND is_active = TRUE
            ",
        )
        .bind(session_token)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn deactivate_all_for_user(&self, user_id: Uuid) -> RepoResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r"
            UPDATE user_sessions SET is_active = FALSE
            WHERE user_id = $1 AND is_active = TRUE
            RETURNING session_token
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> RepoResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r"
            UPDATE user_sessions SET is_active = FALSE
            WHERE is_active = TRUE AND expires_at <= $1
            RETURNING session_token
            ",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}
