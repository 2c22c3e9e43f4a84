//! Network details of the caller, recorded on new sessions

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use hydra_core::RequestContext;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Client IP and user agent
///
/// The IP is the first `x-forwarded-for` hop, then `x-real-ip`, then the
/// peer address when the server was started with connect info.
#[derive(Debug, Clone, Default)]
pub struct ClientContext(pub RequestContext);

impl ClientContext {
    pub fn into_inner(self) -> RequestContext {
        self.0
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn client_ip(parts: &Parts) -> Option<String> {
    header_str(&parts.headers, FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_str(&parts.headers, REAL_IP))
        .map(ToString::to_string)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent =
            header_str(&parts.headers, header::USER_AGENT.as_str()).map(ToString::to_string);
        Ok(Self(RequestContext::new(client_ip(parts), user_agent)))
    }
}
