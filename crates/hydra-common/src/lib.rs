//! # hydra-common
//!
//! Shared utilities including token issuing, password hashing, configuration,
//! error handling, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    validate_password_strength, Argon2Hasher, Claims, PasswordHasher, PasswordService,
    TokenIssuer, TokenType,
};
pub use config::{
    AppConfig, AppSettings, ConfigError, CorsConfig, DatabaseConfig, Environment, JwtConfig,
    RedisConfig, ServerConfig, SessionConfig,
};
pub use error::{AppError, AppResult, ErrorResponse, INVALID_SESSION_MESSAGE};
pub use telemetry::{
    try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError,
    NOTIFICATION_TARGET, SECURITY_TARGET,
};
