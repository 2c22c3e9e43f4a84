//! Authentication service
//!
//! Account flows built on the session lifecycle: registration, login,
//! refresh, logout, password management, email verification and account
//! deletion.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use hydra_common::{validate_password_strength, AppError, SECURITY_TARGET};
use hydra_core::{RequestContext, Session, User};

use crate::dto::{
    AuthResponse, ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordRequest,
    LoginRequest, LogoutResponse, RefreshResponse, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest, SessionResponse, UserResponse, VerifyEmailRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::session::{SessionService, SessionTokens};

/// Emails are compared case-insensitively
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn sessions(&self) -> SessionService<'a> {
        SessionService::new(self.ctx)
    }

    /// Register a new account and open its first session
    #[instrument(skip(self, request, context), fields(email = %request.email))]
    pub async fn register(
        &self,
        request: RegisterRequest,
        context: RequestContext,
    ) -> ServiceResult<AuthResponse> {
        validate_password_strength(&request.password)?;

        let email = normalize_email(&request.email);
        if self.ctx.user_repo().email_exists(&email).await? {
            return Err(ServiceError::conflict("Email already registered"));
        }

        let password_hash = self.ctx.password_service().hash(&request.password)?;
        let user = User::new(Uuid::new_v4(), email, request.name.trim().to_string());
        self.ctx.user_repo().create(&user, &password_hash).await?;

        info!(target: SECURITY_TARGET, user_id = %user.id, "User registered");

        let token = self
            .ctx
            .token_issuer()
            .generate_email_verification_token(user.id, &user.email)?;
        if let Err(e) = self.ctx.notifier().send_email_verification(&user, &token).await {
            warn!(user_id = %user.id, error = %e, "Failed to send verification email");
        }

        let tokens = self
            .sessions()
            .create_session(user.id, request.device_info.unwrap_or_default(), context, false)
            .await?;

        Ok(self.auth_response(&user, tokens))
    }

    /// Log in with email and password
    ///
    /// Unknown email and wrong password fail identically.
    #[instrument(skip(self, request, context), fields(email = %request.email))]
    pub async fn login(
        &self,
        request: LoginRequest,
        context: RequestContext,
    ) -> ServiceResult<AuthResponse> {
        let email = normalize_email(&request.email);

        let Some(user) = self.ctx.user_repo().find_by_email(&email).await? else {
            warn!(target: SECURITY_TARGET, "Login failed: unknown email");
            return Err(ServiceError::invalid_credentials());
        };

        self.check_password(&user, &request.password).await?;

        if !user.is_active {
            warn!(target: SECURITY_TARGET, user_id = %user.id, "Login refused: account disabled");
            return Err(AppError::AccountDisabled.into());
        }

        let tokens = self
            .sessions()
            .create_session(
                user.id,
                request.device_info.unwrap_or_default(),
                context,
                request.remember_me,
            )
            .await?;

        info!(target: SECURITY_TARGET, user_id = %user.id, session_id = %tokens.session.id, "User logged in");

        if let Err(e) = self.ctx.notifier().notify_login(&user, &tokens.session).await {
            warn!(user_id = %user.id, error = %e, "Failed to send login notice");
        }

        Ok(self.auth_response(&user, tokens))
    }

    /// Mint a new access token from a refresh token
    #[instrument(skip(self, request))]
    pub async fn refresh(&self, request: RefreshTokenRequest) -> ServiceResult<RefreshResponse> {
        let refreshed = self
            .sessions()
            .refresh_access_token(&request.refresh_token)
            .await?;
        Ok(refreshed.into())
    }

    /// Log out the given session, or every session of its user
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn logout(
        &self,
        session: &Session,
        logout_all_devices: bool,
    ) -> ServiceResult<LogoutResponse> {
        let sessions = self.sessions();

        let sessions_revoked = if logout_all_devices {
            let count = sessions.remove_all_user_sessions(session.user_id).await?;
            if let Err(e) = self.ctx.notifier().notify_logout_all(session.user_id, count).await {
                warn!(user_id = %session.user_id, error = %e, "Failed to send logout notice");
            }
            count
        } else {
            usize::from(sessions.remove_session(&session.session_token).await?)
        };

        Ok(LogoutResponse { sessions_revoked })
    }

    /// Profile of the authenticated user
    #[instrument(skip(self))]
    pub async fn me(&self, user_id: Uuid) -> ServiceResult<UserResponse> {
        Ok(UserResponse::from(self.live_user(user_id).await?))
    }

    /// Device list of the authenticated user
    #[instrument(skip(self))]
    pub async fn list_sessions(
        &self,
        user_id: Uuid,
        current_session_id: Uuid,
    ) -> ServiceResult<Vec<SessionResponse>> {
        let sessions = self.sessions().list_user_sessions(user_id).await?;
        Ok(sessions
            .iter()
            .map(|s| SessionResponse::from_session(s, current_session_id))
            .collect())
    }

    /// Change the password and sign out every device, returning how many
    /// sessions were revoked
    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> ServiceResult<usize> {
        let user = self.live_user(user_id).await?;
        self.check_password(&user, &request.current_password).await?;
        validate_password_strength(&request.new_password)?;

        let revoked = self.replace_password(&user, &request.new_password).await?;
        info!(target: SECURITY_TARGET, user_id = %user.id, sessions_revoked = revoked, "Password changed");
        Ok(revoked)
    }

    /// Start a password reset. Succeeds whether or not the email is known.
    #[instrument(skip(self, request))]
    pub async fn request_password_reset(&self, request: ForgotPasswordRequest) -> ServiceResult<()> {
        let email = normalize_email(&request.email);
        let Some(user) = self.ctx.user_repo().find_by_email(&email).await? else {
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        let token = self
            .ctx
            .token_issuer()
            .generate_password_reset_token(user.id, &user.email)?;
        if let Err(e) = self.ctx.notifier().send_password_reset(&user, &token).await {
            warn!(user_id = %user.id, error = %e, "Failed to send password reset");
        }

        info!(target: SECURITY_TARGET, user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Complete a password reset and sign out every device
    #[instrument(skip(self, request))]
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ServiceResult<()> {
        let claims = self
            .ctx
            .token_issuer()
            .verify_password_reset_token(&request.token)?;
        validate_password_strength(&request.new_password)?;

        // a reset token dies with the email it was issued for
        let user = self
            .ctx
            .user_repo()
            .find_by_id(claims.user_id()?)
            .await?
            .filter(|u| u.can_authenticate() && claims.email.as_deref() == Some(u.email.as_str()))
            .ok_or(AppError::InvalidToken)?;

        let revoked = self.replace_password(&user, &request.new_password).await?;
        info!(target: SECURITY_TARGET, user_id = %user.id, sessions_revoked = revoked, "Password reset");
        Ok(())
    }

    /// Mark the email address of a verification token as verified
    #[instrument(skip(self, request))]
    pub async fn verify_email(&self, request: VerifyEmailRequest) -> ServiceResult<UserResponse> {
        let claims = self
            .ctx
            .token_issuer()
            .verify_email_verification_token(&request.token)?;

        let mut user = self
            .ctx
            .user_repo()
            .find_by_id(claims.user_id()?)
            .await?
            .filter(|u| claims.email.as_deref() == Some(u.email.as_str()))
            .ok_or(AppError::InvalidToken)?;

        if !user.email_verified {
            self.ctx.user_repo().mark_email_verified(user.id).await?;
            user.mark_email_verified();
            info!(user_id = %user.id, "Email verified");
        }
        Ok(UserResponse::from(user))
    }

    /// Soft delete the account and revoke all of its sessions
    #[instrument(skip(self, request))]
    pub async fn delete_account(
        &self,
        user_id: Uuid,
        request: DeleteAccountRequest,
    ) -> ServiceResult<()> {
        let user = self.live_user(user_id).await?;
        self.check_password(&user, &request.password).await?;

        self.ctx.user_repo().soft_delete(user.id).await?;
        let revoked = self.sessions().remove_all_user_sessions(user.id).await?;

        info!(target: SECURITY_TARGET, user_id = %user.id, sessions_revoked = revoked, "Account deleted");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn live_user(&self, user_id: Uuid) -> ServiceResult<User> {
        match self.ctx.user_repo().find_by_id(user_id).await? {
            Some(user) if user.is_deleted() => Err(AppError::AccountDeleted.into()),
            Some(user) if !user.is_active => Err(AppError::AccountDisabled.into()),
            Some(user) => Ok(user),
            None => Err(AppError::AccountDeleted.into()),
        }
    }

    async fn check_password(&self, user: &User, password: &str) -> ServiceResult<()> {
        let Some(hash) = self.ctx.user_repo().get_password_hash(user.id).await? else {
            warn!(target: SECURITY_TARGET, user_id = %user.id, "No password hash on record");
            return Err(ServiceError::invalid_credentials());
        };

        if !self.ctx.password_service().verify(password, &hash)? {
            warn!(target: SECURITY_TARGET, user_id = %user.id, "Password check failed");
            return Err(ServiceError::invalid_credentials());
        }
        Ok(())
    }

    /// Store a new password hash, revoke every session and notify the user
    async fn replace_password(&self, user: &User, new_password: &str) -> ServiceResult<usize> {
        let hash = self.ctx.password_service().hash(new_password)?;
        self.ctx.user_repo().update_password(user.id, &hash).await?;

        let revoked = self.sessions().remove_all_user_sessions(user.id).await?;

        if let Err(e) = self.ctx.notifier().notify_password_changed(user).await {
            warn!(user_id = %user.id, error = %e, "Failed to send password change notice");
        }
        Ok(revoked)
    }

    fn auth_response(&self, user: &User, tokens: SessionTokens) -> AuthResponse {
        AuthResponse::new(
            UserResponse::from(user),
            tokens.access_token,
            tokens.refresh_token,
            tokens.session.session_token,
            self.ctx.token_issuer().access_token_ttl(),
            tokens.session.expires_at,
        )
    }
}
