//! Business logic services

pub mod auth;
pub mod context;
pub mod error;
pub mod notifier;
pub mod session;
pub mod sweeper;

pub use auth::AuthService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use notifier::{Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use session::{RefreshedTokens, SessionService, SessionTokens};
pub use sweeper::SessionSweeper;
