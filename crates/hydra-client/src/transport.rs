//! HTTP transport seam
//!
//! The gateway only needs "send this request, give me status and JSON body".
//! Keeping that behind [`HttpTransport`] lets tests script the server.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, TransportError};

/// A request as the gateway sees it
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Attach the access token and refresh on 401
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send without a bearer token and never refresh
    #[must_use]
    pub fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// Status and decoded envelope of a response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED.as_u16()
    }

    /// `error.code` from the envelope
    pub fn error_code(&self) -> Option<&str> {
        self.body.pointer("/error/code").and_then(Value::as_str)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.body.pointer("/error/message").and_then(Value::as_str)
    }

    /// Decode `data` from the envelope
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let data = self.body.get("data").cloned().unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Turn a failure envelope into a [`ClientError::Api`]
    pub fn into_api_error(self) -> ClientError {
        ClientError::Api {
            status: self.status,
            code: self.error_code().unwrap_or("UNKNOWN").to_string(),
            message: self.error_message().unwrap_or_default().to_string(),
        }
    }
}

/// Sends one request and returns the raw outcome
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] over a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), url);

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        // Health probes and proxies may answer with an empty or non-JSON body
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        tracing::trace!(status, path = %request.path, "Response received");
        Ok(HttpResponse::new(status, body))
    }
}
