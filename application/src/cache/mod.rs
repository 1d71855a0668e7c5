//! Similarity-aware response cache
//!
//! Keys are derived here; storage is behind the
//! [`CacheStore`](crate::ports::cache_store::CacheStore) port.

pub mod keys;
pub mod service;

pub use service::{CacheLookup, ResponseCache};
