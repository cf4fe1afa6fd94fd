use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use taskmind_core::{Result, TaskMindError};
use tracing::debug;

/// Cache entry metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub ttl: Duration,
    pub access_count: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            access_count: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    pub fn touch(&mut self) {
        self.access_count += 1;
    }
}

/// Key-value capability the pipeline reads and writes through.
///
/// Values are opaque strings; expiry is passive, an entry simply stops
/// being returned once its TTL has elapsed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the live value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<()>;

    /// Get cache statistics
    async fn stats(&self) -> CacheStats;
}

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}

/// Store used when caching is disabled: every read misses, writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _ttl: Duration, _value: String) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Read and deserialize a JSON value stored under `key`.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => {
            let value = serde_json::from_str(&raw).map_err(|e| {
                TaskMindError::Cache(format!("unreadable entry for {}: {}", key, e))
            })?;
            debug!(key, bytes = raw.len(), "cache hit");
            Ok(Some(value))
        }
        None => {
            debug!(key, "cache miss");
            Ok(None)
        }
    }
}

/// Serialize `value` as JSON and store it under `key` for `ttl`.
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set_ex(key, ttl, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_expires_after_ttl() {
        let entry = CacheEntry::new("v", Duration::ZERO);
        assert!(entry.is_expired());

        let entry = CacheEntry::new("v", Duration::from_secs(60));
        assert!(!entry.is_expired());
    }

    #[test]
    fn hit_rate_without_traffic_is_zero() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.miss_rate(), 0.25);
    }

    #[tokio::test]
    async fn noop_store_never_hits() {
        let store = NoopCacheStore;
        store
            .set_ex("k", Duration::from_secs(10), "v".to_string())
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
