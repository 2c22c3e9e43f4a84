//! Entity to DTO mappers

use hydra_core::{Session, User};
use uuid::Uuid;

use super::responses::{RefreshResponse, SessionResponse, UserResponse};
use crate::services::RefreshedTokens;

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

impl SessionResponse {
    /// Map a session, flagging it when it is the caller's own
    pub fn from_session(session: &Session, current_session_id: Uuid) -> Self {
        Self {
            id: session.id.to_string(),
            device_info: session.device_info.clone(),
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            created_at: session.created_at,
            last_used_at: session.last_used_at,
            expires_at: session.expires_at,
            current: session.id == current_session_id,
        }
    }
}

impl From<RefreshedTokens> for RefreshResponse {
    fn from(tokens: RefreshedTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.expires_in,
            expires_at: tokens.expires_at,
        }
    }
}
