//! LLM Gateway port
//!
//! Defines the interface for communicating with LLM providers.

use async_trait::async_trait;
use ensemble_domain::{Model, RejectionKind};
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// How a provider slot that failed with this error is recorded
    pub fn rejection_kind(&self) -> RejectionKind {
        match self {
            GatewayError::Timeout => RejectionKind::Timeout,
            GatewayError::InvalidResponse(_) => RejectionKind::Malformed,
            _ => RejectionKind::Error,
        }
    }
}

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: Model,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: Model, system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with LLM providers.
/// Implementations (adapters) live in the infrastructure layer. Callers apply
/// their own timeouts; adapters should not retry.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Run one completion and return the text
    async fn invoke(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_kind_mapping() {
        assert_eq!(GatewayError::Timeout.rejection_kind(), RejectionKind::Timeout);
        assert_eq!(
            GatewayError::InvalidResponse("no choices".into()).rejection_kind(),
            RejectionKind::Malformed
        );
        assert_eq!(
            GatewayError::RateLimited("429".into()).rejection_kind(),
            RejectionKind::Error
        );
    }
}
