//! Outbound user notifications
//!
//! Email and push delivery live outside this service. The [`Notifier`] seam
//! hands them what to send. Delivery failures are logged by callers and never
//! fail the flow that triggered them.

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use hydra_common::NOTIFICATION_TARGET;
use hydra_core::{Session, User};

use super::error::ServiceResult;

/// Delivery channel for account notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an email verification token
    async fn send_email_verification(&self, user: &User, token: &str) -> ServiceResult<()>;

    /// Deliver a password reset token
    async fn send_password_reset(&self, user: &User, token: &str) -> ServiceResult<()>;

    /// Tell the user about a new sign-in
    async fn notify_login(&self, user: &User, session: &Session) -> ServiceResult<()>;

    /// Tell the user every device was signed out
    async fn notify_logout_all(&self, user_id: Uuid, sessions_revoked: usize) -> ServiceResult<()>;

    /// Tell the user their password changed
    async fn notify_password_changed(&self, user: &User) -> ServiceResult<()>;
}

/// Notifier that only logs on the `notification` target. Tokens are never logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_email_verification(&self, user: &User, _token: &str) -> ServiceResult<()> {
        tracing::info!(target: NOTIFICATION_TARGET, user_id = %user.id, "Email verification issued");
        Ok(())
    }

    async fn send_password_reset(&self, user: &User, _token: &str) -> ServiceResult<()> {
        tracing::info!(target: NOTIFICATION_TARGET, user_id = %user.id, "Password reset issued");
        Ok(())
    }

    async fn notify_login(&self, user: &User, session: &Session) -> ServiceResult<()> {
        tracing::info!(
            target: NOTIFICATION_TARGET,
            user_id = %user.id,
            session_id = %session.id,
            platform = session.device_info.platform.as_deref().unwrap_or("unknown"),
            "New sign-in"
        );
        Ok(())
    }

    async fn notify_logout_all(&self, user_id: Uuid, sessions_revoked: usize) -> ServiceResult<()> {
        tracing::info!(
            target: NOTIFICATION_TARGET,
            user_id = %user_id,
            sessions_revoked,
            "Signed out of all devices"
        );
        Ok(())
    }

    async fn notify_password_changed(&self, user: &User) -> ServiceResult<()> {
        tracing::info!(target: NOTIFICATION_TARGET, user_id = %user.id, "Password changed");
        Ok(())
    }
}

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    EmailVerification { user_id: Uuid, token: String },
    PasswordReset { user_id: Uuid, token: String },
    Login { user_id: Uuid, session_id: Uuid },
    LogoutAll { user_id: Uuid, sessions_revoked: usize },
    PasswordChanged { user_id: Uuid },
}

/// Notifier that keeps everything it is asked to send, for tests and local runs
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Most recent password reset token sent to the user
    pub fn last_reset_token(&self, user_id: Uuid) -> Option<String> {
        self.sent.lock().iter().rev().find_map(|n| match n {
            Notification::PasswordReset { user_id: id, token } if *id == user_id => {
                Some(token.clone())
            }
            _ => None,
        })
    }

    /// Most recent email verification token sent to the user
    pub fn last_verification_token(&self, user_id: Uuid) -> Option<String> {
        self.sent.lock().iter().rev().find_map(|n| match n {
            Notification::EmailVerification { user_id: id, token } if *id == user_id => {
                Some(token.clone())
            }
            _ => None,
        })
    }

    fn push(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email_verification(&self, user: &User, token: &str) -> ServiceResult<()> {
        self.push(Notification::EmailVerification {
            user_id: user.id,
            token: token.to_string(),
        });
        Ok(())
    }

    async fn send_password_reset(&self, user: &User, token: &str) -> ServiceResult<()> {
        self.push(Notification::PasswordReset {
            user_id: user.id,
            token: token.to_string(),
        });
        Ok(())
    }

    async fn notify_login(&self, user: &User, session: &Session) -> ServiceResult<()> {
        self.push(Notification::Login {
            user_id: user.id,
            session_id: session.id,
        });
        Ok(())
    }

    async fn notify_logout_all(&self, user_id: Uuid, sessions_revoked: usize) -> ServiceResult<()> {
        self.push(Notification::LogoutAll {
            user_id,
            sessions_revoked,
        });
        Ok(())
    }

    async fn notify_password_changed(&self, user: &User) -> ServiceResult<()> {
        self.push(Notification::PasswordChanged { user_id: user.id });
        Ok(())
    }
}
