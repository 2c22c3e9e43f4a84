//! # hydra-db
//!
//! Persistence for users and sessions.
//!
//! - PostgreSQL implementations of the `hydra-core` repository traits (sqlx)
//! - In-memory implementations with the same semantics, used by tests and
//!   local development
//! - Connection pool management and schema migrations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hydra_db::{create_pool, run_migrations, PgSessionRepository};
//!
//! async fn example(config: &hydra_common::DatabaseConfig) -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     let sessions = PgSessionRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

pub use memory::{MemorySessionRepository, MemoryUserRepository};
pub use pool::{create_pool, run_migrations, PgPool, PoolSettings};
pub use repositories::{PgSessionRepository, PgUserRepository};
