//! Semantic confidence port
//!
//! Optional external signal blended into per-response confidence.

use async_trait::async_trait;
use ensemble_domain::SemanticConfidence;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Semantic scoring failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait SemanticConfidencePort: Send + Sync {
    async fn score(&self, text: &str, latency_ms: u64) -> Result<SemanticConfidence, SemanticError>;
}
