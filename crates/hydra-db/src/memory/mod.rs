//! In-memory stores
//!
//! Same observable semantics as the PostgreSQL repositories, backed by
//! `DashMap`. Used by tests and by local development without a database.

mod session;
mod user;

pub use session::MemorySessionRepository;
pub use user::MemoryUserRepository;
