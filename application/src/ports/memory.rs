//! Memory port
//!
//! Conversation memory lives outside this service. Reads are best effort and
//! writes are fire-and-forget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("Memory store unavailable: {0}")]
    Unavailable(String),

    #[error("Memory operation failed: {0}")]
    Failed(String),
}

/// One remembered turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub user_id: String,
    pub session_id: String,
    pub content: String,
    pub is_user_prompt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub ensemble_mode: bool,
}

#[async_trait]
pub trait MemoryPort: Send + Sync {
    /// Context string for the user/session, bounded by `max_tokens`
    async fn get_memory_context(
        &self,
        user_id: &str,
        session_id: &str,
        max_tokens: u32,
    ) -> Result<String, MemoryError>;

    async fn store_memory(&self, record: MemoryRecord) -> Result<(), MemoryError>;
}
