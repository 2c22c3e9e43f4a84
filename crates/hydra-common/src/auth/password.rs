//! Password hashing and verification
//!
//! The hashing algorithm is a pluggable primitive behind [`PasswordHasher`].
//! The default implementation is Argon2id.

use std::sync::Arc;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Argon2,
};

use crate::error::{AppError, AppResult};

/// Hash/verify primitive used for account passwords
pub trait PasswordHasher: Send + Sync {
    /// Hash a plain-text password
    fn hash(&self, password: &str) -> AppResult<String>;

    /// Check a plain-text password against a stored hash
    fn verify(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Argon2id hasher with the crate's default parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash format: {e}")))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Password service for dependency injection
#[derive(Clone)]
pub struct PasswordService {
    hasher: Arc<dyn PasswordHasher>,
}

impl PasswordService {
    /// Create a password service around any hasher
    #[must_use]
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { hasher }
    }

    /// Password service backed by Argon2id
    #[must_use]
    pub fn argon2() -> Self {
        Self::new(Arc::new(Argon2Hasher))
    }

    pub fn hash(&self, password: &str) -> AppResult<String> {
        self.hasher.hash(password)
    }

    pub fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        self.hasher.verify(password, hash)
    }

    /// Verify a password and return `InvalidCredentials` if it doesn't match
    pub fn verify_or_error(&self, password: &str, hash: &str) -> AppResult<()> {
        if self.verify(password, hash)? {
            Ok(())
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::argon2()
    }
}

impl std::fmt::Debug for PasswordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordService").finish_non_exhaustive()
    }
}

/// Validate password strength
///
/// Requires at least 8 characters with an uppercase letter, a lowercase
/// letter and a digit.
pub fn validate_password_strength(password: &str) -> AppResult<()> {
    let problem = if password.chars().count() < 8 {
        Some("Password must be at least 8 characters long")
    } else if !password.chars().any(char::is_uppercase) {
        Some("Password must contain at least one uppercase letter")
    } else if !password.chars().any(char::is_lowercase) {
        Some("Password must contain at least one lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one digit")
    } else {
        None
    };

    match problem {
        Some(msg) => Err(AppError::Validation(msg.to_string())),
        None => Ok(()),
    }
}
