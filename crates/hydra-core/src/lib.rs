//! # hydra-core
//!
//! Domain layer containing the user and session entities, domain errors, and the
//! storage traits the session lifecycle is built on.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;

// Re-export commonly used types at crate root
pub use entities::{
    generate_session_token, DeviceInfo, RequestContext, Session, SessionStatus, User,
    SESSION_TOKEN_LEN,
};
pub use error::DomainError;
pub use traits::{RepoResult, SessionCache, SessionRepository, UserRepository};
