//! Service context - dependency container for services
//!
//! Holds the stores, the session cache, the token issuer and the outbound
//! collaborators. Every store sits behind a trait object so the same services
//! run against PostgreSQL/Redis in production and in-memory stores in tests.

use std::sync::Arc;

use hydra_cache::{MemorySessionCache, SharedRedisPool};
use hydra_common::{PasswordService, SessionConfig, TokenIssuer};
use hydra_core::{SessionCache, SessionRepository, UserRepository};
use hydra_db::{MemorySessionRepository, MemoryUserRepository, PgPool};

use super::error::{ServiceError, ServiceResult};
use super::notifier::{Notifier, TracingNotifier};

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Backing pools, present only when the real stores are in use
    pool: Option<PgPool>,
    redis_pool: Option<SharedRedisPool>,

    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_cache: Arc<dyn SessionCache>,

    token_issuer: Arc<TokenIssuer>,
    password_service: PasswordService,
    notifier: Arc<dyn Notifier>,
    session_config: SessionConfig,
}

impl ServiceContext {
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub fn redis_pool(&self) -> Option<&SharedRedisPool> {
        self.redis_pool.as_ref()
    }

    // === Stores ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn session_repo(&self) -> &dyn SessionRepository {
        self.session_repo.as_ref()
    }

    pub fn session_cache(&self) -> &dyn SessionCache {
        self.session_cache.as_ref()
    }

    // === Collaborators ===

    pub fn token_issuer(&self) -> &TokenIssuer {
        self.token_issuer.as_ref()
    }

    pub fn password_service(&self) -> &PasswordService {
        &self.password_service
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    // === Readiness ===

    /// `"healthy"`, `"unhealthy"`, or `"memory"` when no database is configured
    pub async fn database_status(&self) -> &'static str {
        match &self.pool {
            None => "memory",
            Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
                Ok(_) => "healthy",
                Err(e) => {
                    tracing::warn!(error = %e, "Database health check failed");
                    "unhealthy"
                }
            },
        }
    }

    /// `"healthy"`, `"unhealthy"`, or `"memory"` when sessions are cached in process
    pub async fn cache_status(&self) -> &'static str {
        match &self.redis_pool {
            None => "memory",
            Some(pool) => match pool.health_check().await {
                Ok(()) => "healthy",
                Err(e) => {
                    tracing::warn!(error = %e, "Redis health check failed");
                    "unhealthy"
                }
            },
        }
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("pool", &self.pool.is_some())
            .field("redis_pool", &self.redis_pool.is_some())
            .field("token_issuer", &self.token_issuer)
            .field("session_config", &self.session_config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServiceContext`]
///
/// The user store, session store and token issuer are required. The cache
/// defaults to an in-memory cache, the notifier to [`TracingNotifier`], and
/// passwords to Argon2id.
#[derive(Default)]
pub struct ServiceContextBuilder {
    pool: Option<PgPool>,
    redis_pool: Option<SharedRedisPool>,
    user_repo: Option<Arc<dyn UserRepository>>,
    session_repo: Option<Arc<dyn SessionRepository>>,
    session_cache: Option<Arc<dyn SessionCache>>,
    token_issuer: Option<Arc<TokenIssuer>>,
    password_service: Option<PasswordService>,
    notifier: Option<Arc<dyn Notifier>>,
    session_config: Option<SessionConfig>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the stores and cache with fresh in-memory implementations
    pub fn in_memory(self) -> Self {
        self.user_repo(Arc::new(MemoryUserRepository::new()))
            .session_repo(Arc::new(MemorySessionRepository::new()))
    }

    pub fn pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn redis_pool(mut self, redis_pool: SharedRedisPool) -> Self {
        self.redis_pool = Some(redis_pool);
        self
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn session_repo(mut self, repo: Arc<dyn SessionRepository>) -> Self {
        self.session_repo = Some(repo);
        self
    }

    pub fn session_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.session_cache = Some(cache);
        self
    }

    pub fn token_issuer(mut self, issuer: Arc<TokenIssuer>) -> Self {
        self.token_issuer = Some(issuer);
        self
    }

    pub fn password_service(mut self, service: PasswordService) -> Self {
        self.password_service = Some(service);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = Some(config);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if a required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let session_config = self.session_config.unwrap_or_default();
        let session_cache = self
            .session_cache
            .unwrap_or_else(|| Arc::new(MemorySessionCache::new(session_config.cache_ttl)));

        Ok(ServiceContext {
            pool: self.pool,
            redis_pool: self.redis_pool,
            user_repo: self
                .user_repo
                .ok_or_else(|| ServiceError::validation("user_repo is required"))?,
            session_repo: self
                .session_repo
                .ok_or_else(|| ServiceError::validation("session_repo is required"))?,
            session_cache,
            token_issuer: self
                .token_issuer
                .ok_or_else(|| ServiceError::validation("token_issuer is required"))?,
            password_service: self.password_service.unwrap_or_default(),
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(TracingNotifier)),
            session_config,
        })
    }
}
