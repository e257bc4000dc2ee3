//! In-memory TTL cache

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::CacheResult;
use crate::ResponseCache;

/// In-memory cache with per-entry expiry.
///
/// Entries are evicted lazily on read; the map only grows for keys that are
/// written and never read again, which is acceptable for a demo service.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTtlCache {
    entries: Arc<RwLock<HashMap<String, (Value, Instant)>>>,
}

impl InMemoryTtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet evicted) entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for InMemoryTtlCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: evict under the write lock.
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }
}
