//! Session lifecycle
//!
//! Creates, validates, refreshes and revokes sessions. A session is usable
//! while it is active, unexpired, and owned by an active, non-deleted user.
//! Revocation and expiry are terminal: once the store says inactive, nothing
//! here makes it active again.
//!
//! The cache holds snapshots keyed by session token and indexed by session ID.
//! It short-circuits the store read in [`SessionService::validate_session`]
//! and [`SessionService::authenticate`]. Revocation paths deactivate in the
//! store first and invalidate the cache before returning.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use hydra_common::{AppError, Claims, SECURITY_TARGET};
use hydra_core::{
    generate_session_token, DeviceInfo, DomainError, RepoResult, RequestContext, Session,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Attempts at drawing a session token that isn't taken yet
const TOKEN_ATTEMPTS: usize = 3;

/// Credentials handed out when a session is opened
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub session: Session,
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionTokens {
    pub fn session_token(&self) -> &str {
        &self.session.session_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.session.expires_at
    }
}

/// Result of a successful refresh
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// The presented refresh token, unchanged
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Fixed expiry of the owning session
    pub expires_at: DateTime<Utc>,
}

/// Session lifecycle manager
pub struct SessionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SessionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a new session for a user and mint its tokens
    ///
    /// The session expires after the refresh lifetime, or after the
    /// remember-me lifetime when `remember_me` is set. The refresh token
    /// expires together with the session.
    #[instrument(skip(self, device_info, request), fields(user_id = %user_id))]
    pub async fn create_session(
        &self,
        user_id: Uuid,
        device_info: DeviceInfo,
        request: RequestContext,
        remember_me: bool,
    ) -> ServiceResult<SessionTokens> {
        let issuer = self.ctx.token_issuer();
        let lifetime = if remember_me {
            self.ctx.session_config().remember_me_expiry
        } else {
            issuer.refresh_token_ttl()
        };

        let session_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(lifetime);
        let refresh_token = issuer.generate_refresh_token_until(user_id, session_id, expires_at)?;
        let access_token = issuer.generate_access_token(user_id, session_id)?;

        let mut attempt = 0;
        let session = loop {
            attempt += 1;
            let session = Session::new(
                session_id,
                user_id,
                generate_session_token(),
                refresh_token.clone(),
                expires_at,
                device_info.clone(),
                request.clone(),
            );

            match self.ctx.session_repo().create(&session).await {
                Ok(()) => break session,
                Err(DomainError::SessionTokenExists) if attempt < TOKEN_ATTEMPTS => {
                    warn!(attempt, "Session token collision, drawing a new one");
                }
                Err(e) => return Err(e.into()),
            }
        };

        if let Err(e) = self.ctx.session_cache().put(&session).await {
            warn!(error = %e, "Failed to cache new session");
        }

        info!(
            target: SECURITY_TARGET,
            user_id = %user_id,
            session_id = %session.id,
            remember_me,
            ip_address = session.ip_address.as_deref().unwrap_or("-"),
            expires_at = %session.expires_at,
            "Session created"
        );

        Ok(SessionTokens {
            session,
            access_token,
            refresh_token,
        })
    }

    /// Resolve a session token to a usable session
    ///
    /// Returns `None` when the token is unknown, revoked, expired, or owned by
    /// a disabled or deleted account. An expired session found active is
    /// deactivated on the way out. A usable session has `last_used_at`
    /// advanced.
    #[instrument(skip(self, session_token))]
    pub async fn validate_session(&self, session_token: &str) -> ServiceResult<Option<Session>> {
        let cached = self.ctx.session_cache().get(session_token).await;
        self.resolve(cached, self.ctx.session_repo().find_by_token(session_token))
            .await
    }

    /// Resolve a session by ID with the same checks as [`Self::validate_session`]
    #[instrument(skip(self))]
    pub async fn validate_session_by_id(&self, session_id: Uuid) -> ServiceResult<Option<Session>> {
        let cached = self.ctx.session_cache().get_by_id(session_id).await;
        self.resolve(cached, self.ctx.session_repo().find_by_id(session_id))
            .await
    }

    /// Authenticate a bearer access token
    ///
    /// # Errors
    /// Token failures from the issuer, or `SessionRevoked` when the session the
    /// token names is not usable
    #[instrument(skip(self, access_token))]
    pub async fn authenticate(&self, access_token: &str) -> ServiceResult<(Claims, Session)> {
        let claims = self.ctx.token_issuer().verify_access_token(access_token)?;
        let user_id = claims.user_id()?;
        let session_id = claims.session_id()?;

        match self.validate_session_by_id(session_id).await? {
            Some(session) if session.user_id == user_id => Ok((claims, session)),
            _ => {
                debug!(session_id = %session_id, "Access token names an unusable session");
                Err(AppError::SessionRevoked.into())
            }
        }
    }

    /// Mint a new access token from a refresh token
    ///
    /// The refresh token is not rotated and the session expiry never moves.
    ///
    /// # Errors
    /// - `InvalidToken`, `TokenExpired`, `WrongTokenType` from verification
    /// - `SessionRevoked` when no active session holds the token
    /// - `SessionExpired` when the session is past its expiry (it is deactivated)
    /// - `AccountDisabled` / `AccountDeleted` for the owner
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ServiceResult<RefreshedTokens> {
        let issuer = self.ctx.token_issuer();
        let claims = issuer.verify_refresh_token(refresh_token)?;
        let user_id = claims.user_id()?;

        let session = self
            .ctx
            .session_repo()
            .find_active_by_refresh_token(refresh_token)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(AppError::SessionRevoked)?;

        let now = Utc::now();
        if session.is_expired_at(now) {
            self.expire(&session).await?;
            return Err(AppError::SessionExpired.into());
        }

        match self.ctx.user_repo().find_by_id(session.user_id).await? {
            None => return Err(AppError::AccountDeleted.into()),
            Some(user) if user.is_deleted() => return Err(AppError::AccountDeleted.into()),
            Some(user) if !user.is_active => return Err(AppError::AccountDisabled.into()),
            Some(_) => {}
        }

        let access_token = issuer.generate_access_token(session.user_id, session.id)?;
        self.ctx.session_repo().touch(session.id, now).await?;

        debug!(session_id = %session.id, "Access token refreshed");

        Ok(RefreshedTokens {
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: issuer.access_token_ttl(),
            expires_at: session.expires_at,
        })
    }

    /// Revoke one session. Idempotent: unknown or already inactive tokens are fine.
    ///
    /// Returns whether this call deactivated the session.
    #[instrument(skip(self, session_token))]
    pub async fn remove_session(&self, session_token: &str) -> ServiceResult<bool> {
        let deactivated = self
            .ctx
            .session_repo()
            .deactivate_by_token(session_token)
            .await?;
        self.ctx.session_cache().invalidate(session_token).await?;

        if deactivated {
            info!(target: SECURITY_TARGET, "Session revoked");
        }
        Ok(deactivated)
    }

    /// Revoke every active session of a user, returning how many were revoked
    #[instrument(skip(self))]
    pub async fn remove_all_user_sessions(&self, user_id: Uuid) -> ServiceResult<usize> {
        let tokens = self
            .ctx
            .session_repo()
            .deactivate_all_for_user(user_id)
            .await?;

        let cache = self.ctx.session_cache();
        for token in &tokens {
            cache.invalidate(token).await?;
        }
        cache.invalidate_user(user_id).await?;

        info!(
            target: SECURITY_TARGET,
            user_id = %user_id,
            sessions_revoked = tokens.len(),
            "All sessions revoked"
        );
        Ok(tokens.len())
    }

    /// Deactivate every active session past its expiry, returning how many were swept
    #[instrument(skip(self))]
    pub async fn cleanup_expired_sessions(&self) -> ServiceResult<usize> {
        let tokens = self
            .ctx
            .session_repo()
            .deactivate_expired(Utc::now())
            .await?;

        let cache = self.ctx.session_cache();
        for token in &tokens {
            cache.invalidate(token).await?;
        }

        if !tokens.is_empty() {
            info!(target: SECURITY_TARGET, swept = tokens.len(), "Expired sessions deactivated");
        }
        Ok(tokens.len())
    }

    /// Active sessions of a user, newest first
    #[instrument(skip(self))]
    pub async fn list_user_sessions(&self, user_id: Uuid) -> ServiceResult<Vec<Session>> {
        Ok(self.ctx.session_repo().list_active_for_user(user_id).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Take the cached snapshot if there is one, else load from the store
    async fn resolve<F>(
        &self,
        cached: RepoResult<Option<Session>>,
        load: F,
    ) -> ServiceResult<Option<Session>>
    where
        F: Future<Output = RepoResult<Option<Session>>>,
    {
        let cached = cached.unwrap_or_else(|e| {
            warn!(error = %e, "Session cache read failed, using store");
            None
        });

        let (session, from_cache) = match cached {
            Some(session) => (session, true),
            None => match load.await? {
                Some(session) => (session, false),
                None => return Ok(None),
            },
        };

        let Some(session) = self.check_usable(session).await? else {
            return Ok(None);
        };

        if !from_cache {
            self.populate_cache(&session).await;
        }
        Ok(Some(session))
    }

    /// Apply the liveness checks and record a use
    async fn check_usable(&self, mut session: Session) -> ServiceResult<Option<Session>> {
        if !session.is_active {
            return Ok(None);
        }

        let now = Utc::now();
        if session.is_expired_at(now) {
            self.expire(&session).await?;
            return Ok(None);
        }

        let owner = self.ctx.user_repo().find_by_id(session.user_id).await?;
        if !owner.is_some_and(|user| user.can_authenticate()) {
            debug!(session_id = %session.id, "Session owner cannot authenticate");
            return Ok(None);
        }

        self.ctx.session_repo().touch(session.id, now).await?;
        session.touch(now);
        Ok(Some(session))
    }

    /// Lazily deactivate a session found past its expiry
    async fn expire(&self, session: &Session) -> ServiceResult<()> {
        let deactivated = self.ctx.session_repo().deactivate(session.id).await?;
        self.ctx
            .session_cache()
            .invalidate(&session.session_token)
            .await?;

        if deactivated {
            info!(
                target: SECURITY_TARGET,
                user_id = %session.user_id,
                session_id = %session.id,
                "Session expired"
            );
        }
        Ok(())
    }

    /// Cache a snapshot read from the store
    ///
    /// A revocation may land between the store read and the cache write. The
    /// store is read again after the write and the entry dropped if the
    /// session went inactive in between.
    async fn populate_cache(&self, session: &Session) {
        let cache = self.ctx.session_cache();
        if let Err(e) = cache.put(session).await {
            warn!(error = %e, "Failed to cache session");
            return;
        }

        let still_active = match self.ctx.session_repo().find_by_id(session.id).await {
            Ok(current) => current.is_some_and(|s| s.is_active),
            Err(_) => false,
        };
        if !still_active {
            if let Err(e) = cache.invalidate(&session.session_token).await {
                warn!(error = %e, "Failed to drop stale cache entry");
            }
        }
    }
}
