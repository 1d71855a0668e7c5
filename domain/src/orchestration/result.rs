//! The caller-facing ensemble result.

use crate::abstention::AbstentionDecision;
use crate::core::model::Model;
use crate::orchestration::response::{ProviderResponse, ResponseStatus};
use crate::scoring::{ConfidenceScore, QualityMetrics, ScoredResponse};
use crate::synthesis::{SynthesisResult, SynthesisStatus};
use crate::voting::{MetaVotingRecord, VotingResult};
use serde::{Deserialize, Serialize};

/// One provider slot as reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResult {
    pub role: String,
    pub model: Model,
    pub content: String,
    pub status: ResponseStatus,
    pub latency_ms: u64,
    pub confidence: ConfidenceScore,
    pub quality: QualityMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ScoredResponse> for RoleResult {
    fn from(scored: &ScoredResponse) -> Self {
        let ProviderResponse {
            role,
            model,
            content,
            status,
            latency_ms,
            error,
            ..
        } = scored.response.clone();
        Self {
            role,
            model,
            content,
            status,
            latency_ms,
            confidence: scored.confidence.clone(),
            quality: scored.quality.clone(),
            error,
        }
    }
}

/// Abstention outcome together with what the re-query loop did about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstentionReport {
    #[serde(flatten)]
    pub decision: AbstentionDecision,
    /// Re-queries run for this correlation id
    pub attempts: u32,
    /// Whether a re-query result replaced the original
    pub requery_accepted: bool,
    /// Quality of the best rejected or accepted re-query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requery_quality: Option<f64>,
    /// The gate still fired after every allowed attempt
    pub quality_unverified: bool,
}

impl AbstentionReport {
    pub fn new(decision: AbstentionDecision) -> Self {
        Self {
            decision,
            attempts: 0,
            requery_accepted: false,
            requery_quality: None,
            quality_unverified: false,
        }
    }
}

/// Vote plus the advisory and safety records attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingReport {
    #[serde(flatten)]
    pub result: VotingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_voting: Option<MetaVotingRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstention: Option<AbstentionReport>,
}

impl VotingReport {
    pub fn new(result: VotingResult) -> Self {
        Self {
            result,
            meta_voting: None,
            abstention: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFlags {
    /// Served from the cache
    pub cached: bool,
    /// Provider calls were skipped
    pub optimized: bool,
    /// Served by the similarity scan rather than an exact key
    pub similarity_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

impl CacheFlags {
    pub fn exact_hit() -> Self {
        Self {
            cached: true,
            optimized: true,
            similarity_hit: false,
            similarity: Some(1.0),
        }
    }

    pub fn similar_hit(similarity: f64) -> Self {
        Self {
            cached: true,
            optimized: true,
            similarity_hit: true,
            similarity: Some(similarity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Wall time of the whole request in milliseconds
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    pub correlation_id: String,
    pub tier: String,
    /// RFC 3339 completion time
    pub timestamp: String,
    pub cache_flags: CacheFlags,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final answer of one ensemble request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleResult {
    pub synthesis: SynthesisResult,
    pub roles: Vec<RoleResult>,
    pub voting: VotingReport,
    pub metadata: Metadata,
}

impl EnsembleResult {
    /// Terminal result when no provider fulfilled: empty synthesis with
    /// `status=error`, no roles, consensus `none`.
    pub fn degraded(
        correlation_id: impl Into<String>,
        tier: impl Into<String>,
        error: impl Into<String>,
        config_version: impl Into<String>,
    ) -> Self {
        let error = error.into();
        Self {
            synthesis: SynthesisResult::error(error.clone()),
            roles: Vec::new(),
            voting: VotingReport::new(VotingResult::empty(config_version)),
            metadata: Metadata {
                processing_time_ms: 0,
                correlation_id: correlation_id.into(),
                tier: tier.into(),
                timestamp: String::new(),
                cache_flags: CacheFlags::default(),
                degraded: true,
                error: Some(error),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata.degraded
    }

    pub fn quality_unverified(&self) -> bool {
        self.voting
            .abstention
            .as_ref()
            .is_some_and(|a| a.quality_unverified)
    }

    /// Quality score computed by the abstention gate, if it ran
    pub fn quality_score(&self) -> Option<f64> {
        self.voting.abstention.as_ref().map(|a| a.decision.quality_score)
    }

    /// Degraded and unverified results are never cached
    pub fn is_cacheable(&self) -> bool {
        !self.is_degraded()
            && !self.quality_unverified()
            && self.synthesis.status != SynthesisStatus::Error
    }

    pub fn winner(&self) -> Option<&str> {
        self.voting.result.winner.as_deref()
    }
}
