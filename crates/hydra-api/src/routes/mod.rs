//! Route definitions
//!
//! Auth routes are mounted under /api/v1. Health probes sit at the root.

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{auth, health};
use crate::state::AppState;

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_routes())
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_v1_routes() -> Router<AppState> {
    Router::new().merge(auth_routes()).merge(account_routes())
}

/// Session routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/sessions", get(auth::list_sessions))
}

/// Password, email and account routes
fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/password/change", post(auth::change_password))
        .route("/auth/password/forgot", post(auth::forgot_password))
        .route("/auth/password/reset", post(auth::reset_password))
        .route("/auth/email/verify", post(auth::verify_email))
        .route("/auth/account", delete(auth::delete_account))
}
