//! Axum extractors for request handling
//!
//! Custom extractors for authentication, request context, and validation.

mod auth;
mod client;
mod validated;

pub use auth::AuthUser;
pub use client::ClientContext;
pub use validated::{OptionalJson, ValidatedJson};
