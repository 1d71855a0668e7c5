use super::MemoryCacheStore;
use async_trait::async_trait;
use ensemble_application::{CacheError, CacheStore, SimilarEntry};
use ensemble_domain::CacheEntry;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// In-memory front tier over a durable store.
///
/// Writes go to both tiers. Reads try memory first and promote durable hits.
/// A failing durable tier degrades to memory-only operation.
pub struct TieredCacheStore {
    front: MemoryCacheStore,
    back: Arc<dyn CacheStore>,
}

impl TieredCacheStore {
    pub fn new(front: MemoryCacheStore, back: Arc<dyn CacheStore>) -> Self {
        Self { front, back }
    }

    fn degraded(op: &str, err: &CacheError) {
        warn!(op, error = %err, "Durable cache tier failed, using memory only");
    }
}

#[async_trait]
impl CacheStore for TieredCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        if let Some(entry) = self.front.get(key).await? {
            return Ok(Some(entry));
        }
        match self.back.get(key).await {
            Ok(Some(entry)) => {
                self.front.set(entry.clone()).await?;
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                Self::degraded("get", &e);
                Ok(None)
            }
        }
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.front.set(entry.clone()).await?;
        if let Err(e) = self.back.set(entry).await {
            Self::degraded("set", &e);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let front = self.front.delete(key).await?;
        let back = self.back.delete(key).await.unwrap_or_else(|e| {
            Self::degraded("delete", &e);
            false
        });
        Ok(front || back)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let front = self.front.expire(key, ttl).await?;
        let back = self.back.expire(key, ttl).await.unwrap_or_else(|e| {
            Self::degraded("expire", &e);
            false
        });
        Ok(front || back)
    }

    async fn find_similar(
        &self,
        scope: &str,
        fingerprint: &[String],
        threshold: f64,
    ) -> Result<Option<SimilarEntry>, CacheError> {
        let front = self.front.find_similar(scope, fingerprint, threshold).await?;
        if front.as_ref().is_some_and(|hit| hit.similarity >= 1.0) {
            return Ok(front);
        }
        let back = match self.back.find_similar(scope, fingerprint, threshold).await {
            Ok(back) => back,
            Err(e) => {
                Self::degraded("find_similar", &e);
                None
            }
        };

        // the front tier wins ties
        match (front, back) {
            (Some(front), Some(back)) if back.similarity > front.similarity => {
                self.front.set(back.entry.clone()).await?;
                Ok(Some(back))
            }
            (None, Some(back)) => {
                self.front.set(back.entry.clone()).await?;
                Ok(Some(back))
            }
            (front, _) => Ok(front),
        }
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let front = self.front.purge_expired().await?;
        let back = self.back.purge_expired().await.unwrap_or_else(|e| {
            Self::degraded("purge_expired", &e);
            0
        });
        Ok(front + back)
    }
}
