//! Token persistence on the client

use async_trait::async_trait;
use parking_lot::RwLock;

/// Access and refresh token issued together at login
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Where the gateway keeps its tokens
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn access_token(&self) -> Option<String>;

    async fn refresh_token(&self) -> Option<String>;

    /// Replace both tokens
    async fn store(&self, tokens: TokenPair);

    /// Replace the access token only. The refresh token is never rotated.
    async fn set_access_token(&self, access_token: String);

    /// Forget everything, forcing a new login
    async fn clear(&self);
}

/// Process-local token storage
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    tokens: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }

    /// Current tokens, if any
    pub fn snapshot(&self) -> Option<TokenPair> {
        self.tokens.read().clone()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn access_token(&self) -> Option<String> {
        self.tokens.read().as_ref().map(|t| t.access_token.clone())
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().as_ref().map(|t| t.refresh_token.clone())
    }

    async fn store(&self, tokens: TokenPair) {
        *self.tokens.write() = Some(tokens);
    }

    async fn set_access_token(&self, access_token: String) {
        if let Some(tokens) = self.tokens.write().as_mut() {
            tokens.access_token = access_token;
        }
    }

    async fn clear(&self) {
        *self.tokens.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_access_token_keeps_refresh_token() {
        let storage = MemoryTokenStorage::with_tokens(TokenPair::new("a1", "r1"));
        storage.set_access_token("a2".to_string()).await;

        assert_eq!(storage.access_token().await.as_deref(), Some("a2"));
        assert_eq!(storage.refresh_token().await.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_set_access_token_without_login_is_ignored() {
        let storage = MemoryTokenStorage::new();
        storage.set_access_token("a1".to_string()).await;
        assert!(storage.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = MemoryTokenStorage::with_tokens(TokenPair::new("a1", "r1"));
        storage.clear().await;
        assert!(storage.access_token().await.is_none());
        assert!(storage.refresh_token().await.is_none());
    }

    #[test]
    fn test_debug_redacts() {
        let rendered = format!("{:?}", TokenPair::new("secret-access", "secret-refresh"));
        assert!(!rendered.contains("secret"));
    }
}
