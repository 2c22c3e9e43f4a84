//! Test server and HTTP helpers

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hydra_api::{create_app, AppState};
use hydra_client::{
    ApiRequest, ClientTokenGateway, HttpResponse, HttpTransport, MemoryTokenStorage,
    ReqwestTransport, TransportError,
};
use hydra_common::{AppConfig, AppResult, PasswordHasher, PasswordService, TokenIssuer};
use hydra_service::{RecordingNotifier, ServiceContext};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const API: &str = "/api/v1";

/// Stores passwords as-is so tests don't pay for Argon2 in debug builds
#[derive(Debug, Default)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("plain$") == Some(password))
    }
}

/// Running API server plus handles into its internals
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub context: Arc<ServiceContext>,
    pub notifier: Arc<RecordingNotifier>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(&[]).await
    }

    /// Start with extra environment overrides, e.g. `("JWT_ACCESS_TOKEN_EXPIRY", "1")`
    pub async fn start_with(overrides: &[(&str, &str)]) -> Result<Self> {
        let config = test_config(overrides)?;
        let notifier = Arc::new(RecordingNotifier::new());

        let context = Arc::new(
            ServiceContext::builder()
                .in_memory()
                .token_issuer(Arc::new(TokenIssuer::from_config(&config.jwt)))
                .password_service(PasswordService::new(Arc::new(PlainHasher)))
                .session_config(config.session.clone())
                .notifier(notifier.clone())
                .build()?,
        );

        let app = create_app(AppState::new(Arc::clone(&context), config));

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            context,
            notifier,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    pub async fn post_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// POST a body as-is, without a JSON content type when it is empty
    pub async fn post_auth_raw(
        &self,
        path: &str,
        token: &str,
        body: &'static str,
    ) -> Result<Response> {
        let mut request = self.client.post(self.url(path)).bearer_auth(token);
        if !body.is_empty() {
            request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
        }
        Ok(request.body(body).send().await?)
    }

    pub async fn delete_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// Gateway talking to this server over HTTP, counting refresh calls
    pub fn gateway(&self) -> (ClientTokenGateway, Arc<CountingTransport>) {
        self.gateway_with(CountingTransport::new(ReqwestTransport::with_client(
            self.client.clone(),
            self.base_url(),
        )))
    }

    /// Like [`Self::gateway`], but refresh calls wait until the gate opens
    pub fn gated_gateway(&self) -> (ClientTokenGateway, Arc<CountingTransport>) {
        self.gateway_with(
            CountingTransport::new(ReqwestTransport::with_client(
                self.client.clone(),
                self.base_url(),
            ))
            .gated(),
        )
    }

    fn gateway_with(
        &self,
        transport: CountingTransport,
    ) -> (ClientTokenGateway, Arc<CountingTransport>) {
        let transport = Arc::new(transport);
        let gateway =
            ClientTokenGateway::new(transport.clone(), Arc::new(MemoryTokenStorage::new()));
        (gateway, transport)
    }
}

/// Passes requests through, counting how many hit the refresh endpoint.
/// A gated transport holds refresh calls until [`Self::open_gate`].
pub struct CountingTransport {
    inner: ReqwestTransport,
    refresh_calls: AtomicUsize,
    unauthorized: AtomicUsize,
    gate: Option<Semaphore>,
}

impl CountingTransport {
    pub fn new(inner: ReqwestTransport) -> Self {
        Self {
            inner,
            refresh_calls: AtomicUsize::new(0),
            unauthorized: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(64);
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// 401 responses seen on requests other than refresh
    pub fn unauthorized(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let is_refresh = request.path.ends_with("/auth/refresh");
        if is_refresh {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate
                    .acquire()
                    .await
                    .map_err(|e| TransportError(e.to_string()))?;
            }
        }

        let response = self.inner.send(request, bearer).await?;
        if !is_refresh && response.is_unauthorized() {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
        }
        Ok(response)
    }
}

/// Config for an in-memory server on an ephemeral port
pub fn test_config(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("API_PORT", "0"),
        ("DATABASE_URL", "memory://integration"),
        ("JWT_SECRET", "integration-test-secret-with-some-length"),
    ]);
    vars.extend(overrides.iter().copied());

    AppConfig::from_lookup(|key| vars.get(key).map(ToString::to_string))
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Assert the status and return the whole envelope
pub async fn assert_envelope(response: Response, expected_status: StatusCode) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    if status != expected_status {
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(serde_json::from_str(&body)?)
}

/// Assert the status and decode `data` from the envelope
pub async fn assert_data<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let envelope = assert_envelope(response, expected_status).await?;
    Ok(serde_json::from_value(envelope["data"].clone())?)
}

/// Assert the status and return `error.code`
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let envelope = assert_envelope(response, expected_status).await?;
    if envelope["success"] != Value::Bool(false) {
        anyhow::bail!("Expected a failure envelope, got {envelope}");
    }
    envelope["error"]["code"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No error code in {envelope}"))
}
