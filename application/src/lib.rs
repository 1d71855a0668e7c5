//! Application layer for ensemble
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod cache;
pub mod config;
pub mod metrics;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use cache::{CacheLookup, ResponseCache};
pub use config::{CacheSettings, EnsembleConfig, PipelineSettings, TierSettings};
pub use metrics::{EnsembleMetrics, MetricsSnapshot};
pub use ports::{
    cache_store::{CacheError, CacheStore, SimilarEntry},
    llm_gateway::{CompletionRequest, GatewayError, LlmGateway},
    memory::{MemoryError, MemoryPort, MemoryRecord},
    progress::{EnsemblePhase, NoProgress, ProgressNotifier},
    reliability::{ReliabilityError, ReliabilityFeed},
    semantic_confidence::{SemanticConfidencePort, SemanticError},
};
pub use use_cases::run_ensemble::{RunEnsembleError, RunEnsembleUseCase, RunOptions};
pub use use_cases::warm_cache::CacheWarmer;
