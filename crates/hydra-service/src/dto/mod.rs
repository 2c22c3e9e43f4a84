//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for API inputs
//! - Response DTOs and the response envelope
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{
    ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordRequest, LoginRequest,
    LogoutRequest, RefreshTokenRequest, RegisterRequest, ResetPasswordRequest, VerifyEmailRequest,
};

pub use responses::{
    ApiResponse, AuthResponse, HealthChecks, HealthResponse, LogoutResponse, ReadinessResponse,
    RefreshResponse, SessionResponse, UserResponse,
};
