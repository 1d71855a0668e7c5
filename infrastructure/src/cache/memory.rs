use super::best_match;
use async_trait::async_trait;
use dashmap::DashMap;
use ensemble_application::{CacheError, CacheStore, SimilarEntry};
use ensemble_domain::CacheEntry;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Bounded in-process store.
///
/// Past capacity, expired entries are dropped first, then the entries
/// closest to expiry. The bound is re-checked after every insert of a new
/// key, so it holds under concurrent writers.
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
}

impl MemoryCacheStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_at(&self, now: SystemTime) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    /// Evict until the store is back within capacity, sparing `keep`
    fn enforce_capacity(&self, keep: &str) {
        if self.entries.len() <= self.capacity {
            return;
        }
        self.purge_at(SystemTime::now());
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|e| e.key() != keep)
                .min_by_key(|e| e.value().expires_at())
                .map(|e| e.key().clone());
            match victim {
                Some(key) => {
                    debug!(key = %key, "Evicting cache entry");
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.clone())),
            Some(_) => true,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let key = entry.key.clone();
        if self.entries.insert(key.clone(), entry).is_none() {
            self.enforce_capacity(&key);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let Some((key, entry)) = self.entries.remove(key) else {
            return Ok(false);
        };
        if entry.is_expired() {
            return Ok(false);
        }
        let refreshed = entry
            .refreshed(ttl)
            .map_err(|e| CacheError::Codec(e.to_string()))?;
        self.entries.insert(key, refreshed);
        Ok(true)
    }

    async fn find_similar(
        &self,
        scope: &str,
        fingerprint: &[String],
        threshold: f64,
    ) -> Result<Option<SimilarEntry>, CacheError> {
        let now = SystemTime::now();
        Ok(self.entries.iter().fold(None, |best, item| {
            best_match(best, item.value(), scope, fingerprint, threshold, now)
        }))
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(self.purge_at(SystemTime::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::cache::fingerprint;

    fn entry(key: &str, prompt: &str, scope: &str, ttl_secs: u64) -> CacheEntry {
        CacheEntry::new(
            key,
            "{}",
            "sig",
            fingerprint(prompt),
            scope,
            Duration::from_secs(ttl_secs),
        )
        .unwrap()
    }

    fn expired(key: &str) -> CacheEntry {
        entry(key, "old prompt", "tier:free", 60)
            .with_created_at(SystemTime::now() - Duration::from_secs(120))
    }

    #[tokio::test]
    async fn test_get_set_delete() {
        let store = MemoryCacheStore::new(10);
        store.set(entry("a", "What is Rust?", "tier:free", 60)).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_returned() {
        let store = MemoryCacheStore::new(10);
        store.set(expired("old")).await.unwrap();
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_prefers_expired_then_soonest() {
        let store = MemoryCacheStore::new(2);
        store.set(expired("old")).await.unwrap();
        store.set(entry("short", "a b", "s", 10)).await.unwrap();
        store.set(entry("long", "c d", "s", 1_000)).await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("old").await.unwrap().is_none());

        store.set(entry("newest", "e f", "s", 500)).await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("short").await.unwrap().is_none());
        assert!(store.get("long").await.unwrap().is_some());
        assert!(store.get("newest").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let store = MemoryCacheStore::new(1);
        store.set(entry("a", "first prompt", "s", 60)).await.unwrap();
        store.set(entry("a", "second prompt", "s", 60)).await.unwrap();
        assert_eq!(store.len(), 1);
        let e = store.get("a").await.unwrap().unwrap();
        assert!(e.fingerprint.contains(&"second".to_string()));
    }

    #[tokio::test]
    async fn test_expire_restarts_lifetime() {
        let store = MemoryCacheStore::new(10);
        store.set(entry("a", "x", "s", 5)).await.unwrap();
        assert!(store.expire("a", Duration::from_secs(600)).await.unwrap());
        let e = store.get("a").await.unwrap().unwrap();
        assert_eq!(e.ttl(), Duration::from_secs(600));
        assert!(!store.expire("missing", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_similar_respects_scope_and_threshold() {
        let store = MemoryCacheStore::new(10);
        store
            .set(entry("a", "explain rust ownership rules", "tier:free", 60))
            .await
            .unwrap();
        store
            .set(entry("b", "explain rust ownership rules", "tier:premium", 60))
            .await
            .unwrap();
        store
            .set(entry("c", "bake sourdough bread", "tier:free", 60))
            .await
            .unwrap();

        let query = fingerprint("Explain Rust ownership rules, please");
        let hit = store
            .find_similar("tier:free", &query, 0.5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.entry.key, "a");
        assert!(hit.similarity >= 0.5 && hit.similarity <= 1.0);

        assert!(
            store
                .find_similar("tier:free", &query, 0.99)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryCacheStore::new(10);
        store.set(expired("old")).await.unwrap();
        store.set(entry("fresh", "x", "s", 60)).await.unwrap();
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_capacity_holds_under_concurrent_inserts() {
        let store = std::sync::Arc::new(MemoryCacheStore::new(10));
        let writers: Vec<_> = (0..200)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let e = entry(&format!("key-{}", i), "concurrent prompt", "s", 60 + i);
                    store.set(e).await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }
        assert!(store.len() <= 10, "store grew to {}", store.len());
        assert!(!store.is_empty());
    }
}
