//! Redis-backed response cache
//!
//! Enabled with the `redis-backend` feature. Uses a connection manager so a
//! dropped connection is re-established on the next command.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use crate::error::{CacheError, CacheResult};
use crate::ResponseCache;

/// Redis cache with setex-style TTLs.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to a Redis instance, e.g. `redis://localhost:6379`.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Backend(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        raw.map(|payload| serde_json::from_str(&payload))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&value)?;
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, payload, seconds)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }
}
