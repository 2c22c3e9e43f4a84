//! Response DTOs for API endpoints
//!
//! Every body is wrapped in [`ApiResponse`]: `{success, message?, error?, data?}`.
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hydra_common::ErrorResponse;
use hydra_core::DeviceInfo;

// ============================================================================
// Envelope
// ============================================================================

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }
}

impl ApiResponse<()> {
    /// Successful response carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data: None,
        }
    }

    pub fn error(error: ErrorResponse) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
            data: None,
        }
    }
}

// ============================================================================
// Auth Responses
// ============================================================================

/// Tokens and profile returned by register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub session_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Fixed expiry of the session
    pub expires_at: DateTime<Utc>,
}

impl AuthResponse {
    pub fn new(
        user: UserResponse,
        access_token: String,
        refresh_token: String,
        session_token: String,
        expires_in: i64,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user,
            access_token,
            refresh_token,
            session_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_at,
        }
    }
}

/// New access token minted from a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub sessions_revoked: usize,
}

// ============================================================================
// Account Responses
// ============================================================================

/// The authenticated user's own profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// One entry of the device list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub device_info: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether this is the session making the request
    pub current: bool,
}

// ============================================================================
// Health Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Status of each backing service: `healthy`, `unhealthy` or `memory`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: String,
    pub cache: String,
}

impl ReadinessResponse {
    pub fn from_checks(database: &str, cache: &str) -> Self {
        let ready = database != "unhealthy" && cache != "unhealthy";
        Self {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                database: database.to_string(),
                cache: cache.to_string(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_common::AppError;

    #[test]
    fn test_auth_response_wire_format() {
        let user = UserResponse {
            id: "u1".to_string(),
            email: "drinker@example.com".to_string(),
            name: "Drinker".to_string(),
            email_verified: false,
            created_at: Utc::now(),
        };
        let response = AuthResponse::new(
            user,
            "access".to_string(),
            "refresh".to_string(),
            "sess".to_string(),
            900,
            Utc::now(),
        );
        let json = serde_json::to_value(ApiResponse::ok(response)).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["accessToken"], "access");
        assert_eq!(json["data"]["refreshToken"], "refresh");
        assert_eq!(json["data"]["sessionToken"], "sess");
        assert_eq!(json["data"]["tokenType"], "Bearer");
        assert_eq!(json["data"]["expiresIn"], 900);
        assert_eq!(json["data"]["user"]["emailVerified"], false);
        assert!(json["data"]["expiresAt"].is_string());
        assert!(json["data"].get("sessionExpiresAt").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_refresh_response_wire_format() {
        let response = RefreshResponse {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 900,
            expires_at: Utc::now(),
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["accessToken"], "access");
        assert_eq!(json["refreshToken"], "refresh");
        assert!(json["expiresAt"].is_string());
        assert!(json.get("sessionToken").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let json =
            serde_json::to_value(ApiResponse::error(AppError::SessionRevoked.into())).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "INVALID_SESSION");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_message_envelope() {
        let json = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "done");
    }

    #[test]
    fn test_readiness() {
        assert!(ReadinessResponse::from_checks("healthy", "healthy").is_ready());
        assert!(ReadinessResponse::from_checks("memory", "memory").is_ready());

        let not_ready = ReadinessResponse::from_checks("healthy", "unhealthy");
        assert!(!not_ready.is_ready());
        assert_eq!(not_ready.checks.cache, "unhealthy");
    }

    #[test]
    fn test_health() {
        let health = HealthResponse::healthy();
        assert_eq!(health.status, "healthy");
        assert!(!health.version.is_empty());
    }
}
