//! Cache store port
//!
//! Backing storage for ensemble results. Implementations must tolerate
//! concurrent access. Expired entries are never returned.

use async_trait::async_trait;
use ensemble_domain::CacheEntry;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache codec error: {0}")]
    Codec(String),

    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// A similarity-scan match
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarEntry {
    pub entry: CacheEntry,
    pub similarity: f64,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Returns whether an entry was removed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Restart an entry's lifetime. Returns whether the entry existed.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Best live entry in `scope` whose prompt fingerprint similarity is at
    /// least `threshold`
    async fn find_similar(
        &self,
        scope: &str,
        fingerprint: &[String],
        threshold: f64,
    ) -> Result<Option<SimilarEntry>, CacheError>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<usize, CacheError>;
}
