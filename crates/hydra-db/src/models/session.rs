//! Session database model

use chrono::{DateTime, Utc};
use hydra_core::DeviceInfo;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for user_sessions table
#[derive(Debug, Clone, FromRow)]
pub struct SessionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_token: String,
    pub refresh_token: String,
    pub device_info: Json<DeviceInfo>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
