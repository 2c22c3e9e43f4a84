//! PostgreSQL implementations of the repository traits defined in hydra-core

mod error;
mod session;
mod user;

pub use session::PgSessionRepository;
pub use user::PgUserRepository;
