//! The abstention gate.

use super::config::{AbstentionConfig, QualityWeights};
use super::strategy::StrategyKind;
use crate::diversity::DiversityResult;
use crate::scoring::ScoredResponse;
use crate::voting::{ConsensusGrade, VotingResult};
use serde::{Deserialize, Serialize};

/// Why the gate fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbstentionReason {
    VeryWeakConsensus,
    LowVotingConfidence,
    HighFailureRate,
    LowQuality,
    HighDiversityLowConsensus,
    InsufficientResponses,
}

impl AbstentionReason {
    pub const ALL: [AbstentionReason; 6] = [
        AbstentionReason::VeryWeakConsensus,
        AbstentionReason::LowVotingConfidence,
        AbstentionReason::HighFailureRate,
        AbstentionReason::LowQuality,
        AbstentionReason::HighDiversityLowConsensus,
        AbstentionReason::InsufficientResponses,
    ];

    pub fn is_failure_related(&self) -> bool {
        matches!(
            self,
            AbstentionReason::HighFailureRate | AbstentionReason::InsufficientResponses
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbstentionReason::VeryWeakConsensus => "very-weak-consensus",
            AbstentionReason::LowVotingConfidence => "low-voting-confidence",
            AbstentionReason::HighFailureRate => "high-failure-rate",
            AbstentionReason::LowQuality => "low-quality",
            AbstentionReason::HighDiversityLowConsensus => "high-diversity-low-consensus",
            AbstentionReason::InsufficientResponses => "insufficient-responses",
        }
    }
}

impl std::fmt::Display for AbstentionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Medium,
    High,
    Critical,
}

/// Signals the gate evaluates, gathered from one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySignals {
    pub total: usize,
    pub fulfilled: usize,
    pub average_confidence: f64,
    pub average_semantic: Option<f64>,
    pub consensus: ConsensusGrade,
    pub voting_confidence: f64,
    pub diversity: f64,
}

impl QualitySignals {
    pub fn collect(scored: &[ScoredResponse], voting: &VotingResult, diversity: &DiversityResult) -> Self {
        let fulfilled: Vec<&ScoredResponse> = scored.iter().filter(|s| s.is_fulfilled()).collect();
        let average_confidence = mean(fulfilled.iter().map(|s| s.confidence.score));
        let semantic: Vec<f64> = fulfilled.iter().filter_map(|s| s.semantic).collect();
        Self {
            total: scored.len(),
            fulfilled: fulfilled.len(),
            average_confidence,
            average_semantic: (!semantic.is_empty()).then(|| mean(semantic.iter().copied())),
            consensus: voting.consensus,
            voting_confidence: voting.confidence,
            diversity: diversity.overall,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.fulfilled as f64 / self.total as f64
        }
    }

    pub fn failure_rate(&self) -> f64 {
        1.0 - self.success_rate()
    }

    /// Weighted overall quality in [0,1]
    pub fn overall_quality(&self, w: &QualityWeights) -> f64 {
        let semantic = self.average_semantic.unwrap_or(self.average_confidence);
        let score = w.success_rate * self.success_rate()
            + w.confidence * self.average_confidence
            + w.consensus * self.consensus.strength()
            + w.voting_confidence * self.voting_confidence
            + w.semantic * semantic
            + w.agreement * (1.0 - self.diversity.clamp(0.0, 1.0));
        score.clamp(0.0, 1.0)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Outcome of the abstention gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstentionDecision {
    pub triggered: bool,
    pub reasons: Vec<AbstentionReason>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub quality_score: f64,
}

impl AbstentionDecision {
    pub fn passed(quality_score: f64) -> Self {
        Self {
            triggered: false,
            reasons: Vec::new(),
            severity: Severity::None,
            strategy: None,
            quality_score,
        }
    }
}

/// Evaluates whether a result is good enough to return
#[derive(Debug, Clone, Default)]
pub struct AbstentionGate {
    config: AbstentionConfig,
}

impl AbstentionGate {
    pub fn new(config: AbstentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AbstentionConfig {
        &self.config
    }

    pub fn evaluate(&self, signals: &QualitySignals) -> AbstentionDecision {
        let cfg = &self.config;
        let quality = signals.overall_quality(&cfg.quality);
        if !cfg.enabled {
            return AbstentionDecision::passed(quality);
        }

        let mut reasons = Vec::new();
        if signals.consensus == ConsensusGrade::VeryWeak {
            reasons.push(AbstentionReason::VeryWeakConsensus);
        }
        if signals.voting_confidence < cfg.min_voting_confidence {
            reasons.push(AbstentionReason::LowVotingConfidence);
        }
        if signals.failure_rate() > cfg.max_failure_rate {
            reasons.push(AbstentionReason::HighFailureRate);
        }
        if quality < cfg.min_quality {
            reasons.push(AbstentionReason::LowQuality);
        }
        if signals.diversity > cfg.high_diversity
            && signals.consensus.strength() < cfg.low_consensus_strength
        {
            reasons.push(AbstentionReason::HighDiversityLowConsensus);
        }
        if signals.fulfilled < cfg.min_fulfilled {
            reasons.push(AbstentionReason::InsufficientResponses);
        }

        if reasons.is_empty() {
            return AbstentionDecision::passed(quality);
        }

        AbstentionDecision {
            triggered: true,
            severity: severity_of(&reasons),
            strategy: Some(strategy_for(&reasons)),
            reasons,
            quality_score: quality,
        }
    }
}

fn severity_of(reasons: &[AbstentionReason]) -> Severity {
    if reasons.len() >= 3 {
        Severity::Critical
    } else if reasons.len() == 2 || reasons.iter().any(AbstentionReason::is_failure_related) {
        Severity::High
    } else if reasons.is_empty() {
        Severity::None
    } else {
        Severity::Medium
    }
}

/// Failure problems come first, then agreement problems, then quality.
fn strategy_for(reasons: &[AbstentionReason]) -> StrategyKind {
    if reasons.iter().any(AbstentionReason::is_failure_related) {
        StrategyKind::Conservative
    } else if reasons.iter().any(|r| {
        matches!(
            r,
            AbstentionReason::VeryWeakConsensus | AbstentionReason::HighDiversityLowConsensus
        )
    }) {
        StrategyKind::DiversityFocused
    } else {
        StrategyKind::HighQualityFocused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> QualitySignals {
        QualitySignals {
            total: 3,
            fulfilled: 3,
            average_confidence: 0.85,
            average_semantic: None,
            consensus: ConsensusGrade::VeryStrong,
            voting_confidence: 0.7,
            diversity: 0.3,
        }
    }

    #[test]
    fn test_healthy_result_passes() {
        let decision = AbstentionGate::default().evaluate(&healthy());
        assert!(!decision.triggered);
        assert_eq!(decision.severity, Severity::None);
        assert!(decision.strategy.is_none());
        assert!(decision.quality_score > 0.8);
    }

    #[test]
    fn test_very_weak_consensus_abstains() {
        let signals = QualitySignals {
            consensus: ConsensusGrade::VeryWeak,
            voting_confidence: 0.36,
            ..healthy()
        };
        let decision = AbstentionGate::default().evaluate(&signals);
        assert!(decision.triggered);
        assert_eq!(decision.reasons, vec![AbstentionReason::VeryWeakConsensus]);
        assert_eq!(decision.severity, Severity::Medium);
        assert_eq!(decision.strategy, Some(StrategyKind::DiversityFocused));
    }

    #[test]
    fn test_failures_choose_conservative() {
        let signals = QualitySignals {
            fulfilled: 1,
            consensus: ConsensusGrade::VeryStrong,
            voting_confidence: 1.0,
            ..healthy()
        };
        let decision = AbstentionGate::default().evaluate(&signals);
        assert!(decision.reasons.contains(&AbstentionReason::HighFailureRate));
        assert!(decision.reasons.contains(&AbstentionReason::InsufficientResponses));
        assert_eq!(decision.severity, Severity::High);
        assert_eq!(decision.strategy, Some(StrategyKind::Conservative));
    }

    #[test]
    fn test_low_confidence_chooses_high_quality() {
        let signals = QualitySignals {
            voting_confidence: 0.25,
            consensus: ConsensusGrade::Moderate,
            ..healthy()
        };
        let decision = AbstentionGate::default().evaluate(&signals);
        assert_eq!(decision.reasons, vec![AbstentionReason::LowVotingConfidence]);
        assert_eq!(decision.strategy, Some(StrategyKind::HighQualityFocused));
    }

    #[test]
    fn test_many_reasons_are_critical() {
        let signals = QualitySignals {
            total: 3,
            fulfilled: 1,
            average_confidence: 0.2,
            average_semantic: None,
            consensus: ConsensusGrade::VeryWeak,
            voting_confidence: 0.2,
            diversity: 0.9,
        };
        let decision = AbstentionGate::default().evaluate(&signals);
        assert!(decision.reasons.len() >= 3);
        assert_eq!(decision.severity, Severity::Critical);
    }

    #[test]
    fn test_disabled_gate_never_fires() {
        let gate = AbstentionGate::new(AbstentionConfig {
            enabled: false,
            ..AbstentionConfig::default()
        });
        let signals = QualitySignals {
            fulfilled: 0,
            ..healthy()
        };
        assert!(!gate.evaluate(&signals).triggered);
    }

    #[test]
    fn test_quality_uses_semantic_when_present() {
        let w = QualityWeights::default();
        let base = healthy();
        let with_semantic = QualitySignals {
            average_semantic: Some(0.35),
            ..healthy()
        };
        assert!(with_semantic.overall_quality(&w) < base.overall_quality(&w));
    }
}
