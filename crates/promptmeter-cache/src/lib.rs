//! Promptmeter response cache
//!
//! A thin get/set key-value wrapper around repeated identical requests.
//! Cache hits are purely a latency optimization: they never change the
//! result of a computation, only skip it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub mod error;
pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis_backend;

pub use error::{CacheError, CacheResult};
pub use memory::InMemoryTtlCache;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisCache;

/// Response cache abstraction
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Fetch a cached value, if present and not expired.
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Store a value under `key` for `ttl`.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<()>;
}

/// Cache key for an estimate request: one entry per caller, prompt, and
/// completion reserve.
pub fn estimate_key(user_id: &str, prompt: &str, max_completion_tokens: usize) -> String {
    format!("{user_id}:{prompt}:{max_completion_tokens}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_key_distinguishes_inputs() {
        let a = estimate_key("alice", "hello", 512);
        let b = estimate_key("alice", "hello", 256);
        let c = estimate_key("bob", "hello", 512);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
