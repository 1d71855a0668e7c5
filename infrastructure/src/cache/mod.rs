//! Cache store adapters
//!
//! [`MemoryCacheStore`] is a bounded concurrent map, [`FileCacheStore`]
//! keeps one (optionally gzip-compressed) file per entry, and
//! [`TieredCacheStore`] puts the first in front of the second.

mod file;
mod memory;
mod tiered;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;
pub use tiered::TieredCacheStore;

use ensemble_application::SimilarEntry;
use ensemble_domain::CacheEntry;
use std::time::SystemTime;

/// Keep the better of two similarity matches
fn best_match(
    best: Option<SimilarEntry>,
    entry: &CacheEntry,
    scope: &str,
    fingerprint: &[String],
    threshold: f64,
    now: SystemTime,
) -> Option<SimilarEntry> {
    if entry.scope != scope || entry.is_expired_at(now) {
        return best;
    }
    let similarity = entry.similarity_to(fingerprint);
    if similarity < threshold {
        return best;
    }
    match best {
        Some(current) if current.similarity >= similarity => Some(current),
        _ => Some(SimilarEntry {
            entry: entry.clone(),
            similarity,
        }),
    }
}
