//! Token-aware request gateway
//!
//! Every request goes through [`ClientTokenGateway::send`]. A 401 on an
//! authenticated request triggers at most one refresh per burst of failures,
//! after which each failed request is replayed exactly once.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::config::GatewayConfig;
use crate::coordinator::{RefreshCoordinator, RefreshOutcome, RefreshTicket};
use crate::error::{ClientError, ClientResult, RefreshError};
use crate::storage::{TokenPair, TokenStorage};
use crate::transport::{ApiRequest, HttpResponse, HttpTransport};

/// Login payload, as much of it as the client keeps
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: String,
    pub session_token: String,
    pub expires_in: i64,
    pub expires_at: String,
    pub user: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutData {
    pub sessions_revoked: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
}

/// Client entry point for talking to the API
#[derive(Clone)]
pub struct ClientTokenGateway {
    transport: Arc<dyn HttpTransport>,
    storage: Arc<dyn TokenStorage>,
    coordinator: Arc<RefreshCoordinator>,
    config: GatewayConfig,
}

impl ClientTokenGateway {
    pub fn new(transport: Arc<dyn HttpTransport>, storage: Arc<dyn TokenStorage>) -> Self {
        Self::with_config(transport, storage, GatewayConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn TokenStorage>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            transport,
            storage,
            coordinator: Arc::new(RefreshCoordinator::new()),
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn storage(&self) -> &Arc<dyn TokenStorage> {
        &self.storage
    }

    /// Send a request, refreshing and replaying once on 401
    pub async fn send(&self, request: ApiRequest) -> ClientResult<HttpResponse> {
        if !request.authenticated {
            return Ok(self.transport.send(&request, None).await?);
        }

        let token = self.storage.access_token().await;
        let response = self.transport.send(&request, token.as_deref()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        tracing::debug!(
            path = %request.path,
            code = response.error_code().unwrap_or("UNKNOWN"),
            "Request unauthorized, refreshing access token"
        );

        let fresh = self.refresh_rejected(token.as_deref()).await?;
        let replay = self.transport.send(&request, Some(&fresh)).await?;

        if replay.is_unauthorized() {
            return Err(ClientError::Unauthorized {
                code: replay.error_code().unwrap_or("UNAUTHORIZED").to_string(),
            });
        }
        Ok(replay)
    }

    /// Obtain a new access token, sharing one refresh call among concurrent callers
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_rejected(None).await
    }

    /// Refresh after `rejected` drew a 401
    ///
    /// A leader that finds a different token already stored was beaten by a
    /// refresh that settled before it joined, and hands that token out instead.
    async fn refresh_rejected(&self, rejected: Option<&str>) -> RefreshOutcome {
        let guard = match self.coordinator.join() {
            RefreshTicket::Waiter(rx) => {
                return rx.await.unwrap_or(Err(RefreshError::Abandoned));
            }
            RefreshTicket::Leader(guard) => guard,
        };

        if let (Some(rejected), Some(current)) = (rejected, self.storage.access_token().await) {
            if current != rejected {
                let outcome = Ok(current);
                guard.settle(&outcome);
                return outcome;
            }
        }

        let outcome = match timeout(self.config.refresh_timeout, self.perform_refresh()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::TimedOut),
        };

        match &outcome {
            Ok(access_token) => {
                self.storage.set_access_token(access_token.clone()).await;
                tracing::debug!(waiters = self.coordinator.waiting(), "Access token refreshed");
            }
            Err(e) => {
                self.storage.clear().await;
                tracing::warn!(error = %e, "Token refresh failed, stored tokens cleared");
            }
        }

        guard.settle(&outcome);
        outcome
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        let refresh_token = self
            .storage
            .refresh_token()
            .await
            .ok_or(RefreshError::MissingRefreshToken)?;

        let request = ApiRequest::post(
            self.config.refresh_path(),
            json!({ "refreshToken": refresh_token }),
        )
        .public();

        let response = self
            .transport
            .send(&request, None)
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
                code: response.error_code().map(str::to_string),
            });
        }

        response
            .data::<RefreshData>()
            .map(|data| data.access_token)
            .map_err(|e| RefreshError::Malformed(e.to_string()))
    }

    /// Log in and keep the issued tokens
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> ClientResult<LoginData> {
        let request = ApiRequest::post(
            self.config.path("/auth/login"),
            json!({ "email": email, "password": password, "rememberMe": remember_me }),
        )
        .public();

        let data: LoginData = Self::decode(self.send(request).await?)?;
        self.storage
            .store(TokenPair::new(data.access_token.clone(), data.refresh_token.clone()))
            .await;
        Ok(data)
    }

    /// Log out and forget the stored tokens, even when the server call fails
    pub async fn logout(&self, all_devices: bool) -> ClientResult<LogoutData> {
        let request = ApiRequest::post(
            self.config.path("/auth/logout"),
            json!({ "logoutAllDevices": all_devices }),
        );

        let result = self.send(request).await.and_then(Self::decode);
        self.storage.clear().await;
        result
    }

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<T> {
        Self::decode(self.send(ApiRequest::get(self.config.path(endpoint))).await?)
    }

    pub async fn post_json<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> ClientResult<T> {
        Self::decode(self.send(ApiRequest::post(self.config.path(endpoint), body)).await?)
    }

    fn decode<T: DeserializeOwned>(response: HttpResponse) -> ClientResult<T> {
        if response.is_success() {
            response.data()
        } else {
            Err(response.into_api_error())
        }
    }
}

impl std::fmt::Debug for ClientTokenGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTokenGateway")
            .field("config", &self.config)
            .field("refresh_in_flight", &self.coordinator.in_flight())
            .finish()
    }
}
