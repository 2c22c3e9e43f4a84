//! # hydra-service
//!
//! Application layer: the session lifecycle manager, account flows built on
//! it, request/response DTOs, and the background expiry sweep.

pub mod dto;
pub mod services;

pub use services::{
    AuthService, Notification, Notifier, RecordingNotifier, RefreshedTokens, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, SessionService, SessionSweeper,
    SessionTokens, TracingNotifier,
};
