//! Session entity - one login on one device
//!
//! A session binds a user, a device and a refresh token. `is_active = false`
//! is terminal and `expires_at` is fixed when the session is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the opaque session token
pub const SESSION_TOKEN_LEN: usize = 64;

/// Client device description sent at login
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    pub device_id: Option<String>,
    pub platform: Option<String>,
    pub model: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
}

/// Network details of the request that opened a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
        }
    }
}

/// Externally observable lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Revoked,
    Expired,
}

/// Persisted login session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_token: String,
    pub refresh_token: String,
    pub device_info: DeviceInfo,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    /// Create a new active session
    pub fn new(
        id: Uuid,
        user_id: Uuid,
        session_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
        device_info: DeviceInfo,
        context: RequestContext,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            session_token,
            refresh_token,
            device_info,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
            created_at: now,
            last_used_at: now,
            expires_at,
            is_active: true,
        }
    }

    /// Check whether the session is past its expiry at `now`
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check whether the session is past its expiry
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Active and not yet expired at `now` (owner checks are done by the caller)
    #[inline]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    /// Lifecycle state at `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> SessionStatus {
        if !self.is_active {
            SessionStatus::Revoked
        } else if self.is_expired_at(now) {
            SessionStatus::Expired
        } else {
            SessionStatus::Active
        }
    }

    /// Record a use of the session. Never touches `expires_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_used_at {
            self.last_used_at = now;
        }
    }

    /// Deactivate the session
    pub fn revoke(&mut self) {
        self.is_active = false;
    }

    /// Seconds left before expiry, used to bound cache entries
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Generate a cryptographically secure random session token
pub fn generate_session_token() -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::thread_rng();
    (0..SESSION_TOKEN_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> Session {
        Session::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            generate_session_token(),
            "refresh".to_string(),
            expires_at,
            DeviceInfo::default(),
            RequestContext::new(Some("10.0.0.1".to_string()), Some("hydra-ios/2.1".to_string())),
        )
    }

    #[test]
    fn test_new_session_is_active() {
        let session = session_expiring_at(Utc::now() + Duration::hours(1));
        assert!(session.is_active);
        assert_eq!(session.status_at(Utc::now()), SessionStatus::Active);
        assert_eq!(session.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(session.user_agent.as_deref(), Some("hydra-ios/2.1"));
    }

    #[test]
    fn test_expired_session() {
        let now = Utc::now();
        let session = session_expiring_at(now - Duration::seconds(1));
        assert!(session.is_expired_at(now));
        assert!(!session.is_usable_at(now));
        assert_eq!(session.status_at(now), SessionStatus::Expired);
    }

    #[test]
    fn test_revoked_session_reports_revoked_even_when_expired() {
        let now = Utc::now();
        let mut session = session_expiring_at(now - Duration::seconds(1));
        session.revoke();
        assert_eq!(session.status_at(now), SessionStatus::Revoked);
    }

    #[test]
    fn test_touch_never_extends_expiry() {
        let now = Utc::now();
        let mut session = session_expiring_at(now + Duration::minutes(5));
        let expires_at = session.expires_at;

        session.touch(now + Duration::minutes(1));
        assert_eq!(session.expires_at, expires_at);
        assert_eq!(session.last_used_at, now + Duration::minutes(1));

        // older timestamps do not move last_used_at backwards
        session.touch(now - Duration::minutes(1));
        assert_eq!(session.last_used_at, now + Duration::minutes(1));
    }

    #[test]
    fn test_remaining_secs_never_negative() {
        let now = Utc::now();
        let session = session_expiring_at(now - Duration::minutes(1));
        assert_eq!(session.remaining_secs(now), 0);
    }

    #[test]
    fn test_generate_session_token() {
        let token1 = generate_session_token();
        let token2 = generate_session_token();

        assert_eq!(token1.len(), SESSION_TOKEN_LEN);
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_device_info_camel_case() {
        let json = r#"{"deviceId":"abc","platform":"android"}"#;
        let info: DeviceInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.device_id.as_deref(), Some("abc"));
        assert_eq!(info.platform.as_deref(), Some("android"));
        assert!(info.model.is_none());
    }
}
