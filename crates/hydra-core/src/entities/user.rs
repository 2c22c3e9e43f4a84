//! User entity - the account that owns sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account as seen by the authentication subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active, unverified user
    pub fn new(id: Uuid, email: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            name,
            is_active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if the account has been soft deleted
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether sessions owned by this user may be used
    #[inline]
    pub fn can_authenticate(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    /// Mark the email address as verified
    pub fn mark_email_verified(&mut self) {
        self.email_verified = true;
        self.updated_at = Utc::now();
    }

    /// Soft delete the account
    pub fn mark_deleted(&mut self) {
        let now = Utc::now();
        self.is_active = false;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}
