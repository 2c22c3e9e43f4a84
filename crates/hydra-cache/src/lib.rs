//! # hydra-cache
//!
//! Read-through cache of session records keyed by session token, with a
//! session ID index for bearer authentication.
//!
//! The cache only short-circuits the session store read. A miss falls back to
//! the store, and revocation always invalidates before it returns.
//!
//! ## Example
//!
//! ```ignore
//! use hydra_cache::{create_shared_pool, RedisPoolConfig, RedisSessionCache};
//!
//! let pool = create_shared_pool(RedisPoolConfig::default())?;
//! let cache = RedisSessionCache::new(pool, 300);
//! ```

pub mod pool;
pub mod session;

pub use pool::{
    create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool,
};
pub use session::{MemorySessionCache, RedisSessionCache};
