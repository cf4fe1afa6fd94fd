use crate::{CacheEntry, CacheStats, CacheStore};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use taskmind_core::Result;
use tracing::{debug, trace};

/// In-process TTL store backed by a concurrent map.
///
/// Expired entries are dropped lazily on read and swept when the store is
/// full. When a sweep does not free room, the oldest entry is evicted. The
/// entry count never stays above `max_entries` once a write returns.
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, CacheEntry<String>>>,
    stats: Arc<Mutex<CacheStats>>,
    max_entries: usize,
}

impl MemoryCacheStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            stats: Arc::new(Mutex::new(CacheStats::default())),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.stats.lock().expirations += removed as u64;
            debug!(removed, "purged expired cache entries");
        }
        removed
    }

    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        self.purge_expired();
        self.evict_oldest(self.max_entries - 1, None);
    }

    /// Evict oldest entries until at most `limit` remain, sparing `keep`.
    fn evict_oldest(&self, limit: usize, keep: Option<&str>) {
        while self.entries.len() > limit {
            let oldest = self
                .entries
                .iter()
                .filter(|entry| Some(entry.key().as_str()) != keep)
                .min_by_key(|entry| entry.value().created_at)
                .map(|entry| entry.key().clone());

            let Some(key) = oldest else { break };
            if self.entries.remove(&key).is_some() {
                self.stats.lock().evictions += 1;
                trace!(key = %key, "evicted oldest cache entry");
            }
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let hit = match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.touch();
                Some(entry.value.clone())
            }
            _ => None,
        };

        let mut stats = self.stats.lock();
        match hit {
            Some(value) => {
                stats.hits += 1;
                Ok(Some(value))
            }
            None => {
                stats.misses += 1;
                drop(stats);
                if self
                    .entries
                    .remove_if(key, |_, entry| entry.is_expired())
                    .is_some()
                {
                    self.stats.lock().expirations += 1;
                }
                Ok(None)
            }
        }
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<()> {
        if !self.entries.contains_key(key) {
            self.make_room();
        }
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));

        // Concurrent writers of new keys can each pass make_room first.
        if self.entries.len() > self.max_entries {
            self.evict_oldest(self.max_entries, Some(key));
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.entries = self.entries.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_reads_back() {
        let store = MemoryCacheStore::new(16);
        store
            .set_ex("a", Duration::from_secs(60), "alpha".into())
            .await
            .unwrap();

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("alpha"));
        assert_eq!(store.get("b").await.unwrap(), None);

        let stats = store.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let store = MemoryCacheStore::new(16);
        store
            .set_ex("short", Duration::from_millis(20), "v".into())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.is_empty());
        assert_eq!(store.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn overwriting_a_key_replaces_value_and_ttl() {
        let store = MemoryCacheStore::new(16);
        store
            .set_ex("k", Duration::from_millis(10), "old".into())
            .await
            .unwrap();
        store
            .set_ex("k", Duration::from_secs(60), "new".into())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn full_store_evicts_oldest() {
        let store = MemoryCacheStore::new(2);
        for key in ["first", "second", "third"] {
            store
                .set_ex(key, Duration::from_secs(60), key.to_string())
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("first").await.unwrap(), None);
        assert_eq!(store.get("third").await.unwrap().as_deref(), Some("third"));
        assert_eq!(store.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn full_store_prefers_dropping_expired_entries() {
        let store = MemoryCacheStore::new(2);
        store
            .set_ex("stale", Duration::from_millis(5), "s".into())
            .await
            .unwrap();
        store
            .set_ex("fresh", Duration::from_secs(60), "f".into())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        store
            .set_ex("newest", Duration::from_secs(60), "n".into())
            .await
            .unwrap();

        assert_eq!(store.get("fresh").await.unwrap().as_deref(), Some("f"));
        assert_eq!(store.get("newest").await.unwrap().as_deref(), Some("n"));
        let stats = store.stats().await;
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
    }
}
