//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation (PostgreSQL, Redis, or in-memory).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{Session, User};
use crate::error::DomainError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a non-deleted user by ID
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;

    /// Find a non-deleted user by email
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Check if email is already taken
    async fn email_exists(&self, email: &str) -> RepoResult<bool>;

    /// Create a new user
    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<()>;

    /// Get password hash for authentication
    async fn get_password_hash(&self, id: Uuid) -> RepoResult<Option<String>>;

    /// Update password hash
    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<()>;

    /// Flag the user's email address as verified
    async fn mark_email_verified(&self, id: Uuid) -> RepoResult<()>;

    /// Soft delete a user
    async fn soft_delete(&self, id: Uuid) -> RepoResult<()>;
}

// ============================================================================
// Session Repository
// ============================================================================

/// Persistent session store.
///
/// Rows are never physically deleted. Every deactivating method only matches
/// rows that are still active, so an inactive session can never become active
/// again.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new session row
    async fn create(&self, session: &Session) -> RepoResult<()>;

    /// Find a session by its ID, regardless of state
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Session>>;

    /// Find a session by its opaque session token, regardless of state
    async fn find_by_token(&self, session_token: &str) -> RepoResult<Option<Session>>;

    /// Find an active session holding the given refresh token
    async fn find_active_by_refresh_token(&self, refresh_token: &str)
        -> RepoResult<Option<Session>>;

    /// List the active sessions of a user, newest first
    async fn list_active_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Session>>;

    /// Advance `last_used_at`
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()>;

    /// Deactivate one session by ID. Returns false if it was already inactive.
    async fn deactivate(&self, id: Uuid) -> RepoResult<bool>;

    /// Deactivate one session by token. Returns false if missing or already inactive.
    async fn deactivate_by_token(&self, session_token: &str) -> RepoResult<bool>;

    /// Deactivate every active session of a user, returning the revoked session tokens
    async fn deactivate_all_for_user(&self, user_id: Uuid) -> RepoResult<Vec<String>>;

    /// Deactivate every active session past its expiry, returning the revoked session tokens
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> RepoResult<Vec<String>>;
}

// ============================================================================
// Session Cache
// ============================================================================

/// Read-through cache of session records keyed by session token, with a
/// secondary index by session ID for bearer authentication.
///
/// Entries are snapshots. Callers still apply the expiry and owner checks to
/// whatever the cache returns.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Fetch a cached snapshot
    async fn get(&self, session_token: &str) -> RepoResult<Option<Session>>;

    /// Fetch a cached snapshot by session ID. Misses once the token entry is gone.
    async fn get_by_id(&self, session_id: Uuid) -> RepoResult<Option<Session>>;

    /// Store a snapshot of an active session
    async fn put(&self, session: &Session) -> RepoResult<()>;

    /// Drop the entry for one session token
    async fn invalidate(&self, session_token: &str) -> RepoResult<()>;

    /// Drop every entry belonging to a user
    async fn invalidate_user(&self, user_id: Uuid) -> RepoResult<()>;
}
