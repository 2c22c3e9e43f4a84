//! Gateway configuration

use std::time::Duration;

/// Where the API lives and how long a refresh may take
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Path prefix of the versioned API
    pub api_prefix: String,
    /// Upper bound on the refresh call. A timed-out refresh fails every waiter.
    pub refresh_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/v1".to_string(),
            refresh_timeout: Duration::from_secs(10),
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Full path of an API endpoint
    pub fn path(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_prefix.trim_end_matches('/'), endpoint)
    }

    pub fn refresh_path(&self) -> String {
        self.path("/auth/refresh")
    }
}
