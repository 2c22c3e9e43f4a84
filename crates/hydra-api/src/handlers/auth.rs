//! Authentication handlers
//!
//! Endpoints for registration, login, refresh, logout, and account management.

use axum::extract::State;
use hydra_service::dto::{
    AuthResponse, ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordRequest,
    LoginRequest, LogoutRequest, LogoutResponse, RefreshResponse, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest, SessionResponse, UserResponse, VerifyEmailRequest,
};
use hydra_service::AuthService;

use crate::extractors::{AuthUser, ClientContext, OptionalJson, ValidatedJson};
use crate::response::{ApiResult, Created, Data, Message};
use crate::state::AppState;

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<Created<AuthResponse>> {
    let response = AuthService::new(state.service_context())
        .register(request, context)
        .await?;
    Ok(Created(response, "Account created"))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Data<AuthResponse>> {
    let response = AuthService::new(state.service_context())
        .login(request, context)
        .await?;
    Ok(Data(response))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> ApiResult<Data<RefreshResponse>> {
    let response = AuthService::new(state.service_context())
        .refresh(request)
        .await?;
    Ok(Data(response))
}

/// POST /auth/logout
///
/// The body is optional. Without it only the calling session is logged out.
/// A body that does not parse is rejected.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    OptionalJson(body): OptionalJson<LogoutRequest>,
) -> ApiResult<Data<LogoutResponse>> {
    let request = body.unwrap_or_default();
    let response = AuthService::new(state.service_context())
        .logout(&auth.session, request.logout_all_devices)
        .await?;
    Ok(Data(response))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Data<UserResponse>> {
    let user = AuthService::new(state.service_context())
        .me(auth.user_id)
        .await?;
    Ok(Data(user))
}

/// GET /auth/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Data<Vec<SessionResponse>>> {
    let sessions = AuthService::new(state.service_context())
        .list_sessions(auth.user_id, auth.session_id())
        .await?;
    Ok(Data(sessions))
}

/// POST /auth/password/change
///
/// Every session, the caller's included, is signed out.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Message> {
    AuthService::new(state.service_context())
        .change_password(auth.user_id, request)
        .await?;
    Ok(Message("Password changed. Please sign in again."))
}

/// POST /auth/password/forgot
///
/// Answers the same whether or not the address belongs to an account.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Message> {
    AuthService::new(state.service_context())
        .request_password_reset(request)
        .await?;
    Ok(Message(
        "If the address belongs to an account, a reset link has been sent.",
    ))
}

/// POST /auth/password/reset
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Message> {
    AuthService::new(state.service_context())
        .reset_password(request)
        .await?;
    Ok(Message("Password reset. Please sign in again."))
}

/// POST /auth/email/verify
pub async fn verify_email(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<VerifyEmailRequest>,
) -> ApiResult<Data<UserResponse>> {
    let user = AuthService::new(state.service_context())
        .verify_email(request)
        .await?;
    Ok(Data(user))
}

/// DELETE /auth/account
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<DeleteAccountRequest>,
) -> ApiResult<Message> {
    AuthService::new(state.service_context())
        .delete_account(auth.user_id, request)
        .await?;
    Ok(Message("Account deleted"))
}
