//! Response types and error handling for API endpoints
//!
//! Every body, success or failure, goes out in the `{success, message?, error?, data?}`
//! envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hydra_common::{AppError, ErrorResponse};
use hydra_service::dto::ApiResponse;
use hydra_service::ServiceError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// API error type for consistent error responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    App(#[from] AppError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self::InvalidBody(msg.into())
    }

    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            Self::App(e) => e.status_code(),
            Self::Service(e) => e.status_code(),
            Self::Validation(_) | Self::InvalidBody(_) => 400,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Error body for the envelope
    fn body(self) -> ErrorResponse {
        match self {
            Self::App(e) => ErrorResponse::from(e),
            Self::Service(e) => ErrorResponse::from(AppError::from(e)),
            Self::Validation(errors) => ErrorResponse {
                code: "VALIDATION_ERROR".to_string(),
                message: "Request validation failed".to_string(),
                details: serde_json::to_value(&errors).ok(),
            },
            Self::InvalidBody(msg) => ErrorResponse {
                code: "INVALID_BODY".to_string(),
                message: msg,
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = ?self, "Server error occurred");
        }

        (status, Json(ApiResponse::error(self.body()))).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// 200 with `data` in the envelope
pub struct Data<T>(pub T);

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(ApiResponse::ok(self.0)).into_response()
    }
}

/// 201 with `data` and a message in the envelope
pub struct Created<T>(pub T, pub &'static str);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (
            StatusCode::CREATED,
            Json(ApiResponse::ok_with_message(self.0, self.1)),
        )
            .into_response()
    }
}

/// 200 with only a message in the envelope
pub struct Message(pub &'static str);

impl IntoResponse for Message {
    fn into_response(self) -> Response {
        Json(ApiResponse::message(self.0)).into_response()
    }
}
