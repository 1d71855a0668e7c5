//! Cached ensemble results.

mod entry;

pub use entry::{
    CacheEntry, CacheScope, MIN_SIMILARITY_TERMS, fingerprint, fingerprint_similarity,
};
