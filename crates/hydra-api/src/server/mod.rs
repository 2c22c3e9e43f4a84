//! Server setup and initialization
//!
//! Builds the service context from configuration, wires the router, and runs
//! the HTTP server alongside the session sweeper.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use hydra_cache::{create_shared_pool, RedisPoolConfig, RedisSessionCache};
use hydra_common::{AppConfig, AppError, TokenIssuer};
use hydra_db::{create_pool, run_migrations, PgSessionRepository, PgUserRepository};
use hydra_service::{ServiceContext, ServiceContextBuilder, SessionSweeper};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::middleware::apply_middleware;
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// `DATABASE_URL` scheme that selects the in-memory stores
pub const MEMORY_DATABASE_SCHEME: &str = "memory:";

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let config = state.config();
    let router = create_router().merge(health_routes());
    let router = apply_middleware(router, &config.cors, config.app.env.is_production());
    router.with_state(state)
}

/// Connect the stores and cache named by the configuration
pub async fn create_service_context(config: &AppConfig) -> Result<ServiceContext, AppError> {
    let token_issuer = Arc::new(TokenIssuer::from_config(&config.jwt));
    let mut builder = ServiceContextBuilder::new()
        .token_issuer(token_issuer)
        .session_config(config.session.clone());

    if config.database.url.starts_with(MEMORY_DATABASE_SCHEME) {
        warn!("Using in-memory user and session stores, data is lost on restart");
        builder = builder.in_memory();
    } else {
        info!("Connecting to PostgreSQL...");
        let pool = create_pool(&config.database)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        run_migrations(&pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        info!("PostgreSQL connection established");

        builder = builder
            .user_repo(Arc::new(PgUserRepository::new(pool.clone())))
            .session_repo(Arc::new(PgSessionRepository::new(pool.clone())))
            .pool(pool);
    }

    match &config.redis {
        Some(redis) => {
            let redis_pool = create_shared_pool(RedisPoolConfig::from(redis))
                .map_err(|e| AppError::Cache(e.to_string()))?;
            if let Err(e) = redis_pool.health_check().await {
                warn!(error = %e, "Redis not reachable yet, session cache reads will fall back to the store");
            }
            builder = builder
                .session_cache(Arc::new(RedisSessionCache::new(
                    redis_pool.clone(),
                    config.session.cache_ttl,
                )))
                .redis_pool(redis_pool);
        }
        None => info!("REDIS_URL not set, caching sessions in process memory"),
    }

    builder.build().map_err(|e| AppError::Config(e.to_string()))
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let ctx = create_service_context(&config).await?;
    Ok(AppState::new(Arc::new(ctx), config))
}

/// Serve until ctrl-c
pub async fn run_server(app: Router, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.api.address();
    let state = create_app_state(config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = SessionSweeper::from_context(state.shared_context()).spawn(shutdown_rx);

    let result = run_server(create_app(state), &addr).await;

    shutdown_tx.send(true).ok();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Session sweeper task failed");
    }

    info!("Server stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
