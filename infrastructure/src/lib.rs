//! Infrastructure layer for ensemble
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: HTTP provider adapters, cache stores and
//! configuration file loading.

pub mod cache;
pub mod config;
pub mod providers;

// Re-export commonly used types
pub use cache::{FileCacheStore, MemoryCacheStore, TieredCacheStore};
pub use config::{
    CacheStoreSettings, ConfigLoader, ConfigValidationError, FileConfig, FileOutputConfig,
    ResolvedConfig,
};
pub use providers::{AnthropicAdapter, OpenAiCompatibleAdapter, ProviderAdapter, RoutingGateway};
