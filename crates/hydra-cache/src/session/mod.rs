//! Session cache implementations

mod memory;
mod redis_cache;

pub use memory::MemorySessionCache;
pub use redis_cache::RedisSessionCache;

use chrono::{DateTime, Utc};
use hydra_core::Session;

/// Seconds an entry may live: never past the session's own expiry
pub(crate) fn entry_ttl(session: &Session, max_ttl: u64, now: DateTime<Utc>) -> Option<u64> {
    if !session.is_active {
        return None;
    }
    match u64::try_from(session.remaining_secs(now)) {
        Ok(0) | Err(_) => None,
        Ok(remaining) => Some(remaining.min(max_ttl)),
    }
}
