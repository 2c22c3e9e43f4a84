//! Storage traits (ports)

mod repositories;

pub use repositories::{RepoResult, SessionCache, SessionRepository, UserRepository};
