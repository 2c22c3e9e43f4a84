//! Token issuing and verification
//!
//! Signs and verifies every token type the auth subsystem hands out using the
//! `jsonwebtoken` crate. All token types share one signing key, so every
//! verifier checks the `type` claim after the signature, issuer, audience and
//! expiry checks pass.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};

/// Token purpose, carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    PasswordReset,
    EmailVerification,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::PasswordReset => "password_reset",
            Self::EmailVerification => "email_verification",
        };
        f.write_str(name)
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Token purpose
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Session ID, present on access and refresh tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Email address, present on reset and verification tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    /// Get the user ID
    ///
    /// # Errors
    /// Returns `InvalidToken` if the subject is not a UUID
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }

    /// Get the session ID
    ///
    /// # Errors
    /// Returns `InvalidToken` if the claim is missing or not a UUID
    pub fn session_id(&self) -> AppResult<Uuid> {
        self.sid
            .as_deref()
            .and_then(|sid| Uuid::parse_str(sid).ok())
            .ok_or(AppError::InvalidToken)
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs and verifies access, refresh, password reset and email verification tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_ttl: i64,
    refresh_token_ttl: i64,
    password_reset_ttl: i64,
    email_verification_ttl: i64,
    leeway: u64,
}

impl TokenIssuer {
    /// Create an issuer with the given secret and access/refresh lifetimes in seconds.
    /// Reset and verification lifetimes default to 1h and 24h.
    #[must_use]
    pub fn new(secret: &str, access_token_ttl: i64, refresh_token_ttl: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: "hydra-auth".to_string(),
            audience: "hydra-app".to_string(),
            access_token_ttl,
            refresh_token_ttl,
            password_reset_ttl: 60 * 60,
            email_verification_ttl: 24 * 60 * 60,
            leeway: 0,
        }
    }

    /// Create an issuer from configuration
    #[must_use]
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(
            &config.secret,
            config.access_token_expiry,
            config.refresh_token_expiry,
        )
        .with_issuer(config.issuer.clone(), config.audience.clone())
        .with_password_reset_ttl(config.password_reset_expiry)
        .with_email_verification_ttl(config.email_verification_expiry)
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self.audience = audience.into();
        self
    }

    #[must_use]
    pub fn with_password_reset_ttl(mut self, seconds: i64) -> Self {
        self.password_reset_ttl = seconds;
        self
    }

    #[must_use]
    pub fn with_email_verification_ttl(mut self, seconds: i64) -> Self {
        self.email_verification_ttl = seconds;
        self
    }

    /// Clock skew tolerated on `exp`, in seconds
    #[must_use]
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Access token lifetime in seconds
    pub fn access_token_ttl(&self) -> i64 {
        self.access_token_ttl
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_token_ttl(&self) -> i64 {
        self.refresh_token_ttl
    }

    // =========================================================================
    // Session tokens
    // =========================================================================

    /// Mint a short-lived access token bound to a session
    pub fn generate_access_token(&self, user_id: Uuid, session_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        self.sign(
            user_id,
            TokenType::Access,
            Some(session_id),
            None,
            now,
            now + Duration::seconds(self.access_token_ttl),
        )
    }

    /// Mint a refresh token with the configured refresh lifetime
    pub fn generate_refresh_token(&self, user_id: Uuid, session_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        self.generate_refresh_token_until(
            user_id,
            session_id,
            now + Duration::seconds(self.refresh_token_ttl),
        )
    }

    /// Mint a refresh token that expires together with its session
    pub fn generate_refresh_token_until(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> AppResult<String> {
        self.sign(
            user_id,
            TokenType::Refresh,
            Some(session_id),
            None,
            Utc::now(),
            expires_at,
        )
    }

    /// Verify an access token
    ///
    /// # Errors
    /// `TokenExpired`, `InvalidToken`, or `WrongTokenType`
    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::Access)
    }

    /// Verify a refresh token
    ///
    /// # Errors
    /// `TokenExpired`, `InvalidToken`, or `WrongTokenType`
    pub fn verify_refresh_token(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::Refresh)
    }

    // =========================================================================
    // Single-purpose tokens
    // =========================================================================

    /// Mint a password reset token (default lifetime 1h)
    pub fn generate_password_reset_token(&self, user_id: Uuid, email: &str) -> AppResult<String> {
        let now = Utc::now();
        self.sign(
            user_id,
            TokenType::PasswordReset,
            None,
            Some(email.to_string()),
            now,
            now + Duration::seconds(self.password_reset_ttl),
        )
    }

    /// Verify a password reset token
    pub fn verify_password_reset_token(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::PasswordReset)
    }

    /// Mint an email verification token (default lifetime 24h)
    pub fn generate_email_verification_token(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> AppResult<String> {
        let now = Utc::now();
        self.sign(
            user_id,
            TokenType::EmailVerification,
            None,
            Some(email.to_string()),
            now,
            now + Duration::seconds(self.email_verification_ttl),
        )
    }

    /// Verify an email verification token
    pub fn verify_email_verification_token(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::EmailVerification)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn sign(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        session_id: Option<Uuid>,
        email: Option<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            token_type,
            sid: session_id.map(|id| id.to_string()),
            email,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode {token_type} token: {e}")))
    }

    fn verify(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(kind = ?e.kind(), expected = %expected, "Token verification failed");
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            }
        })?;

        let claims = token_data.claims;
        if claims.token_type != expected {
            tracing::warn!(
                expected = %expected,
                actual = %claims.token_type,
                "Token presented for the wrong purpose"
            );
            return Err(AppError::WrongTokenType);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish_non_exhaustive()
    }
}
