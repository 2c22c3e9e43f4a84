//! Client error types

use thiserror::Error;

/// Why a refresh did not produce a new access token
///
/// `Clone` so one outcome can be handed to every request waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No refresh token stored")]
    MissingRefreshToken,

    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16, code: Option<String> },

    #[error("Refresh request failed: {0}")]
    Network(String),

    #[error("Refresh timed out")]
    TimedOut,

    /// The task running the refresh went away before it finished
    #[error("Refresh abandoned before completing")]
    Abandoned,

    #[error("Malformed refresh response: {0}")]
    Malformed(String),
}

impl RefreshError {
    /// The server refused the refresh token itself
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Failure reaching the server at all
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

/// Gateway error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Still 401 after a refresh and one replay
    #[error("Unauthorized ({code})")]
    Unauthorized { code: String },

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Any other non-success envelope
    #[error("API error {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Malformed response: {0}")]
    Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
