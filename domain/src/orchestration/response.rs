//! Provider responses collected by dispatch.

use crate::core::model::Model;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a provider slot was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionKind {
    /// Per-provider timeout or aggregate deadline
    Timeout,
    /// Vendor/transport error
    Error,
    /// Empty or unusable content
    Malformed,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionKind::Timeout => write!(f, "timeout"),
            RejectionKind::Error => write!(f, "error"),
            RejectionKind::Malformed => write!(f, "malformed"),
        }
    }
}

/// Settled state of one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Fulfilled,
    Rejected(RejectionKind),
}

impl ResponseStatus {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, ResponseStatus::Fulfilled)
    }
}

/// Response from a single provider slot. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    /// Slot role (stable provider id)
    pub role: String,
    pub model: Model,
    pub content: String,
    pub status: ResponseStatus,
    pub latency_ms: u64,
    /// Error message if rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw vendor metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ProviderResponse {
    /// Creates a fulfilled response. Blank content is downgraded to
    /// `rejected(malformed)`.
    pub fn fulfilled(
        role: impl Into<String>,
        model: Model,
        content: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        let content = content.into();
        if content.trim().is_empty() {
            return Self::rejected(
                role,
                model,
                RejectionKind::Malformed,
                "Provider returned empty content",
                latency_ms,
            );
        }
        Self {
            role: role.into(),
            model,
            content,
            status: ResponseStatus::Fulfilled,
            latency_ms,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a rejected response.
    pub fn rejected(
        role: impl Into<String>,
        model: Model,
        kind: RejectionKind,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            role: role.into(),
            model,
            content: String::new(),
            status: ResponseStatus::Rejected(kind),
            latency_ms,
            error: Some(error.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_fulfilled(&self) -> bool {
        self.status.is_fulfilled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_content_is_malformed() {
        let r = ProviderResponse::fulfilled("gpt4o", Model::Gpt4o, "  ", 100);
        assert_eq!(r.status, ResponseStatus::Rejected(RejectionKind::Malformed));
        assert!(!r.is_fulfilled());
        assert!(r.error.is_some());
    }

    #[test]
    fn test_fulfilled() {
        let r = ProviderResponse::fulfilled("gpt4o", Model::Gpt4o, "Answer.", 100)
            .with_metadata("finish_reason", serde_json::json!("stop"));
        assert!(r.is_fulfilled());
        assert_eq!(r.metadata.len(), 1);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ResponseStatus::Fulfilled).unwrap();
        assert_eq!(json, "\"fulfilled\"");
        let json = serde_json::to_string(&ResponseStatus::Rejected(RejectionKind::Timeout)).unwrap();
        assert_eq!(json, "{\"rejected\":\"timeout\"}");
    }
}
