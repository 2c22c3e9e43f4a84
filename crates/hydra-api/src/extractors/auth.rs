//! Authentication extractor
//!
//! Resolves the `Authorization: Bearer` access token to a live session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use hydra_common::{AppError, Claims};
use hydra_core::Session;
use hydra_service::SessionService;
use uuid::Uuid;

use crate::response::ApiError;
use crate::state::AppState;

/// Caller authenticated by access token, with the session it is bound to
///
/// Rejections:
/// - no bearer header: `MISSING_AUTH`
/// - expired token: `TOKEN_EXPIRED`
/// - malformed or wrong-type token: `INVALID_TOKEN`
/// - session revoked, expired, or owner unusable: `INVALID_SESSION`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session: Session,
    pub claims: Claims,
}

impl AuthUser {
    pub fn session_id(&self) -> Uuid {
        self.session.id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::from(AppError::MissingAuth))?;

        let app_state = AppState::from_ref(state);
        let (claims, session) = SessionService::new(app_state.service_context())
            .authenticate(bearer.token())
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Bearer authentication failed");
                ApiError::from(e)
            })?;

        Ok(Self {
            user_id: session.user_id,
            session,
            claims,
        })
    }
}
