//! Response cache service
//!
//! Wraps a [`CacheStore`] with key derivation, serialization and the lookup
//! order: exact key, then similarity scan, then miss. Store failures are
//! logged and treated as a miss (reads) or a no-op (writes).
//!
//! An exact hit must carry the signature of its own prompt and payload;
//! entries that do not are dropped. A similarity scan needs at least
//! [`MIN_SIMILARITY_TERMS`] prompt terms.

use super::keys;
use crate::config::CacheSettings;
use crate::ports::cache_store::CacheStore;
use ensemble_domain::cache::{MIN_SIMILARITY_TERMS, fingerprint};
use ensemble_domain::{CacheEntry, CacheFlags, EnsembleResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit {
        result: Box<EnsembleResult>,
        flags: CacheFlags,
    },
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit { .. })
    }
}

pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    settings: CacheSettings,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, settings: CacheSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub async fn lookup(&self, prompt: &str, scope: &str) -> CacheLookup {
        if !self.settings.enabled {
            return CacheLookup::Miss;
        }

        let key = keys::cache_key(prompt, scope);
        match self.store.get(&key).await {
            Ok(Some(entry)) if !entry.is_expired() => match decode(&entry) {
                Some(result) if signature_of(prompt, &result) == entry.signature => {
                    debug!(key = %key, "Cache hit (exact)");
                    return CacheLookup::Hit {
                        result: Box::new(result),
                        flags: CacheFlags::exact_hit(),
                    };
                }
                Some(_) => {
                    warn!(key = %key, "Cache entry signature mismatch, dropping it");
                    if let Err(e) = self.store.delete(&key).await {
                        warn!(key = %key, "Cache delete failed: {}", e);
                    }
                }
                None => {}
            },
            Ok(_) => {}
            Err(e) => {
                warn!(key = %key, "Cache read failed: {}", e);
                return CacheLookup::Miss;
            }
        }

        let fingerprint = fingerprint(prompt);
        if fingerprint.len() < MIN_SIMILARITY_TERMS {
            return CacheLookup::Miss;
        }
        match self
            .store
            .find_similar(scope, &fingerprint, self.settings.similarity_threshold)
            .await
        {
            Ok(Some(similar)) if !similar.entry.is_expired() => match decode(&similar.entry) {
                Some(result) => {
                    debug!(
                        key = %similar.entry.key,
                        similarity = similar.similarity,
                        "Cache hit (similar prompt)"
                    );
                    CacheLookup::Hit {
                        result: Box::new(result),
                        flags: CacheFlags::similar_hit(similar.similarity),
                    }
                }
                None => CacheLookup::Miss,
            },
            Ok(_) => CacheLookup::Miss,
            Err(e) => {
                warn!("Cache similarity scan failed: {}", e);
                CacheLookup::Miss
            }
        }
    }

    /// Write a result through to the store. Returns whether it was stored;
    /// degraded and quality-unverified results are skipped.
    pub async fn store(&self, prompt: &str, scope: &str, result: &EnsembleResult) -> bool {
        if !self.settings.enabled || !result.is_cacheable() {
            return false;
        }

        let payload = match serde_json::to_string(result) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Cache payload serialization failed: {}", e);
                return false;
            }
        };
        let key = keys::cache_key(prompt, scope);
        let signature = signature_of(prompt, result);
        let entry = match CacheEntry::new(
            key.clone(),
            payload,
            signature,
            fingerprint(prompt),
            scope,
            self.settings.ttl,
        ) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache entry rejected: {}", e);
                return false;
            }
        };

        match self.store.set(entry).await {
            Ok(()) => {
                debug!(key = %key, "Cached ensemble result");
                true
            }
            Err(e) => {
                warn!(key = %key, "Cache write failed: {}", e);
                false
            }
        }
    }

    pub async fn invalidate(&self, prompt: &str, scope: &str) -> bool {
        let key = keys::cache_key(prompt, scope);
        match self.store.delete(&key).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(key = %key, "Cache delete failed: {}", e);
                false
            }
        }
    }

    /// Restart the lifetime of a cached prompt
    pub async fn touch(&self, prompt: &str, scope: &str) -> bool {
        let key = keys::cache_key(prompt, scope);
        match self.store.expire(&key, self.settings.ttl).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %key, "Cache expire failed: {}", e);
                false
            }
        }
    }

    pub async fn purge_expired(&self) -> usize {
        match self.store.purge_expired().await {
            Ok(n) => n,
            Err(e) => {
                warn!("Cache purge failed: {}", e);
                0
            }
        }
    }
}

fn signature_of(prompt: &str, result: &EnsembleResult) -> String {
    keys::signature(&keys::prompt_hash(prompt), &keys::response_shape(result))
}

fn decode(entry: &CacheEntry) -> Option<EnsembleResult> {
    match serde_json::from_str(&entry.payload) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(key = %entry.key, "Discarding undecodable cache entry: {}", e);
            None
        }
    }
}
