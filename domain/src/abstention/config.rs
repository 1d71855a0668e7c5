//! Abstention thresholds and quality weights.

use serde::{Deserialize, Serialize};

/// Weights of the overall quality score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub success_rate: f64,
    pub confidence: f64,
    pub consensus: f64,
    pub voting_confidence: f64,
    pub semantic: f64,
    pub agreement: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            success_rate: 0.2,
            confidence: 0.25,
            consensus: 0.2,
            voting_confidence: 0.15,
            semantic: 0.1,
            agreement: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbstentionConfig {
    pub enabled: bool,
    pub max_requery_attempts: u32,
    pub cooldown_ms: u64,
    /// Attempt counters older than this are purged
    pub tracker_ttl_secs: u64,
    pub min_voting_confidence: f64,
    pub max_failure_rate: f64,
    pub min_quality: f64,
    pub high_diversity: f64,
    /// Consensus strength under which high diversity triggers
    pub low_consensus_strength: f64,
    pub min_fulfilled: usize,
    /// A re-query must beat the original quality by this factor
    pub improvement_ratio: f64,
    pub quality: QualityWeights,
}

impl Default for AbstentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requery_attempts: 2,
            cooldown_ms: 500,
            tracker_ttl_secs: 600,
            min_voting_confidence: 0.3,
            max_failure_rate: 0.5,
            min_quality: 0.4,
            high_diversity: 0.8,
            low_consensus_strength: 0.4,
            min_fulfilled: 2,
            improvement_ratio: 1.10,
            quality: QualityWeights::default(),
        }
    }
}
