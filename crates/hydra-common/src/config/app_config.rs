//! Application configuration structs
//!
//! Loaded from environment variables, with a `.env` file honoured when present.

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub database: DatabaseConfig,
    /// Absent means sessions are cached in process memory
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Token signing configuration. Lifetimes are in seconds.
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,
    #[serde(default = "default_password_reset_expiry")]
    pub password_reset_expiry: i64,
    #[serde(default = "default_email_verification_expiry")]
    pub email_verification_expiry: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish_non_exhaustive()
    }
}

/// Session lifecycle configuration. Durations are in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime when the client asks to be remembered
    #[serde(default = "default_remember_me_expiry")]
    pub remember_me_expiry: i64,
    /// Period of the expired-session sweep
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Upper bound on how long a cached session snapshot lives
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            remember_me_expiry: default_remember_me_expiry(),
            cleanup_interval: default_cleanup_interval(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_app_name() -> String {
    "hydra-auth".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_issuer() -> String {
    "hydra-auth".to_string()
}

fn default_audience() -> String {
    "hydra-app".to_string()
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> i64 {
    604_800 // 7 days
}

fn default_password_reset_expiry() -> i64 {
    3600
}

fn default_email_verification_expiry() -> i64 {
    86_400
}

fn default_remember_me_expiry() -> i64 {
    2_592_000 // 30 days
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_cache_ttl() -> u64 {
    300
}

/// Variable lookup backing [`AppConfig::from_lookup`]
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &'static str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingVar(key))
    }

    fn or(&self, key: &'static str, default: fn() -> String) -> String {
        self.get(key).unwrap_or_else(default)
    }

    /// Parse a variable, falling back to the default when unset.
    /// A value that is set but does not parse is an error.
    fn parsed<T: FromStr>(&self, key: &'static str, default: fn() -> T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, raw)),
            None => Ok(default()),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if required variables are missing or malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let env = match vars.get("APP_ENV") {
            Some(raw) => {
                Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?
            }
            None => Environment::default(),
        };

        let redis = match vars.get("REDIS_URL") {
            Some(url) => Some(RedisConfig {
                url,
                max_connections: vars
                    .parsed("REDIS_MAX_CONNECTIONS", default_redis_max_connections)?,
            }),
            None => None,
        };

        let secret = vars.required("JWT_SECRET")?;
        if secret.len() < 32 && env.is_production() {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET",
                "must be at least 32 bytes in production".to_string(),
            ));
        }

        let raw_port = vars.required("API_PORT")?;
        let port: u16 = raw_port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("API_PORT", raw_port.clone()))?;

        Ok(Self {
            app: AppSettings {
                name: vars.or("APP_NAME", default_app_name),
                env,
            },
            api: ServerConfig {
                host: vars.or("API_HOST", default_host),
                port,
            },
            database: DatabaseConfig {
                url: vars.required("DATABASE_URL")?,
                max_connections: vars.parsed("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: vars.parsed("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
            },
            redis,
            jwt: JwtConfig {
                secret,
                issuer: vars.or("JWT_ISSUER", default_issuer),
                audience: vars.or("JWT_AUDIENCE", default_audience),
                access_token_expiry: vars
                    .parsed("JWT_ACCESS_TOKEN_EXPIRY", default_access_token_expiry)?,
                refresh_token_expiry: vars
                    .parsed("JWT_REFRESH_TOKEN_EXPIRY", default_refresh_token_expiry)?,
                password_reset_expiry: vars
                    .parsed("JWT_PASSWORD_RESET_EXPIRY", default_password_reset_expiry)?,
                email_verification_expiry: vars.parsed(
                    "JWT_EMAIL_VERIFICATION_EXPIRY",
                    default_email_verification_expiry,
                )?,
            },
            session: SessionConfig {
                remember_me_expiry: vars
                    .parsed("SESSION_REMEMBER_ME_EXPIRY", default_remember_me_expiry)?,
                cleanup_interval: vars
                    .parsed("SESSION_CLEANUP_INTERVAL", default_cleanup_interval)?,
                cache_ttl: vars.parsed("SESSION_CACHE_TTL", default_cache_ttl)?,
            },
            cors: CorsConfig {
                allowed_origins: vars
                    .get("CORS_ALLOWED_ORIGINS")
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
