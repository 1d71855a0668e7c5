//! Per-response confidence scoring.

use super::config::ScoringConfig;
use super::quality::{self, QualityMetrics, CAUSAL, CONTRASTIVE, EVIDENTIAL};
use crate::core::text;
use crate::orchestration::response::{ProviderResponse, ResponseStatus};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:[.,]\d+)?\s*%?").expect("valid regex"));

/// Qualitative confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::VeryLow => write!(f, "very-low"),
            ConfidenceLevel::Low => write!(f, "low"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::High => write!(f, "high"),
        }
    }
}

/// Confidence of one response: a [0,1] score, its level and the factors that
/// contributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub score: f64,
    pub level: ConfidenceLevel,
    pub factors: Vec<String>,
}

impl ConfidenceScore {
    /// Score of a rejected response
    pub fn zero(reason: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            level: ConfidenceLevel::VeryLow,
            factors: vec![reason.into()],
        }
    }
}

/// External semantic-confidence signal for one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticConfidence {
    pub score: f64,
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
}

/// A provider response together with its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResponse {
    pub response: ProviderResponse,
    pub confidence: ConfidenceScore,
    pub quality: QualityMetrics,
    /// Semantic score used in the blend, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<f64>,
}

impl ScoredResponse {
    pub fn is_fulfilled(&self) -> bool {
        self.response.is_fulfilled()
    }

    pub fn role(&self) -> &str {
        &self.response.role
    }
}

/// Deterministic confidence & quality scorer
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a response. The semantic signal, when present, is blended 70/30
    /// with the structural score.
    pub fn score(
        &self,
        response: &ProviderResponse,
        semantic: Option<&SemanticConfidence>,
    ) -> ScoredResponse {
        if !response.is_fulfilled() {
            return ScoredResponse {
                response: response.clone(),
                confidence: ConfidenceScore::zero(format!("provider {}", status_label(response))),
                quality: QualityMetrics::empty(),
                semantic: None,
            };
        }

        let quality = QualityMetrics::analyze(&response.content);
        let mut factors = Vec::new();
        let structural = self.structural_score(response, &quality, &mut factors);

        let (score, semantic_score) = match semantic {
            Some(signal) if signal.score.is_finite() => {
                let sem = signal.score.clamp(0.0, 1.0);
                let w = self.config.semantic_weight.clamp(0.0, 1.0);
                factors.push(format!("semantic blend ({:.2})", sem));
                (w * sem + (1.0 - w) * structural, Some(sem))
            }
            _ => (structural, None),
        };
        let score = score.clamp(0.0, 1.0);

        ScoredResponse {
            response: response.clone(),
            confidence: ConfidenceScore {
                score,
                level: self.level_for(score),
                factors,
            },
            quality,
            semantic: semantic_score,
        }
    }

    /// Map a score onto its level
    pub fn level_for(&self, score: f64) -> ConfidenceLevel {
        let levels = &self.config.levels;
        if score >= levels.high {
            ConfidenceLevel::High
        } else if score >= levels.medium {
            ConfidenceLevel::Medium
        } else if score >= levels.low {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    fn structural_score(
        &self,
        response: &ProviderResponse,
        quality: &QualityMetrics,
        factors: &mut Vec<String>,
    ) -> f64 {
        let cfg = &self.config;
        let content = response.content.as_str();
        let mut score = cfg.base;

        let length = cfg.length.bonus_for(quality.word_count);
        if length >= cfg.length.bonus {
            factors.push("optimal length".to_string());
        } else if quality.word_count < cfg.length.min_words {
            factors.push("short response".to_string());
        } else {
            factors.push("long response".to_string());
        }
        score += length;

        let structure = self.structure_bonus(content, quality);
        if structure >= cfg.structure_cap * 0.75 {
            factors.push("well structured".to_string());
        }
        score += structure;

        let sophistication = self.sophistication_bonus(content, quality);
        if sophistication > 0.0 {
            factors.push("contains reasoning".to_string());
        }
        score += sophistication;

        let latency = cfg.latency.adjustment_for(response.latency_ms);
        if latency > 0.0 {
            factors.push("fast response".to_string());
        } else if latency < 0.0 {
            factors.push("slow response".to_string());
        }
        score += latency;

        let prior = cfg.prior_for(response.model.vendor());
        if prior != 0.0 {
            factors.push(format!("{} reliability prior", response.model.vendor()));
        }
        score += prior;

        score.clamp(0.0, 1.0)
    }

    fn structure_bonus(&self, content: &str, quality: &QualityMetrics) -> f64 {
        let trimmed = content.trim();
        let mut bonus: f64 = 0.0;
        if trimmed.ends_with(['.', '!', '?']) {
            bonus += 0.05;
        }
        if trimmed.chars().next().is_some_and(|c| c.is_uppercase()) {
            bonus += 0.05;
        }
        if quality.sentence_count >= 2 {
            bonus += 0.05;
        }
        if quality::has_list(content) || trimmed.contains("\n\n") {
            bonus += 0.05;
        }
        bonus.min(self.config.structure_cap)
    }

    fn sophistication_bonus(&self, content: &str, quality: &QualityMetrics) -> f64 {
        let mut bonus: f64 = 0.0;
        if CAUSAL.is_match(content) {
            bonus += 0.06;
        }
        if CONTRASTIVE.is_match(content) {
            bonus += 0.05;
        }
        if EVIDENTIAL.is_match(content) {
            bonus += 0.05;
        }
        if quality.word_count > 0 {
            let technical = text::words(content)
                .into_iter()
                .filter(|w| is_technical(w))
                .count();
            if technical as f64 / quality.word_count as f64 >= self.config.technical_density {
                bonus += 0.05;
            }
        }
        if NUMERIC.is_match(content) {
            bonus += 0.04;
        }
        bonus.min(self.config.sophistication_cap)
    }
}

fn is_technical(word: &str) -> bool {
    let w = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
    if w.chars().count() >= 9 || w.contains('_') || w.contains("::") {
        return true;
    }
    let has_digit = w.chars().any(|c| c.is_ascii_digit());
    let has_alpha = w.chars().any(|c| c.is_alphabetic());
    let inner_upper = w.chars().skip(1).any(|c| c.is_uppercase());
    (has_digit && has_alpha) || inner_upper
}

fn status_label(response: &ProviderResponse) -> String {
    match response.status {
        ResponseStatus::Fulfilled => "fulfilled".to_string(),
        ResponseStatus::Rejected(kind) => format!("rejected ({})", kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Model;
    use crate::orchestration::response::RejectionKind;

    const RICH: &str = "Rust prevents data races because the borrow checker enforces \
        exclusive mutable access at compile time. However, unsafe blocks can opt out of \
        these guarantees. For example, FFI boundaries frequently require unsafe code. \
        Benchmarks show roughly 30% fewer memory bugs in components migrated to Rust, \
        according to several industry reports.";

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::default()
    }

    #[test]
    fn test_rejected_scores_zero() {
        let r = ProviderResponse::rejected("gpt4o", Model::Gpt4o, RejectionKind::Timeout, "t", 12_000);
        let scored = scorer().score(&r, None);
        assert_eq!(scored.confidence.score, 0.0);
        assert_eq!(scored.confidence.level, ConfidenceLevel::VeryLow);
        assert_eq!(scored.quality, QualityMetrics::empty());
    }

    #[test]
    fn test_rich_response_scores_high() {
        let r = ProviderResponse::fulfilled("claude", Model::ClaudeSonnet4, RICH, 900);
        let scored = scorer().score(&r, None);
        assert!(scored.confidence.score > 0.8, "{}", scored.confidence.score);
        assert_eq!(scored.confidence.level, ConfidenceLevel::High);
        assert!(scored.confidence.factors.iter().any(|f| f == "contains reasoning"));
        assert!(scored.confidence.factors.iter().any(|f| f == "fast response"));
    }

    #[test]
    fn test_terse_slow_response_scores_low() {
        let r = ProviderResponse::fulfilled("x", Model::Custom("local".into()), "yes", 11_000);
        let scored = scorer().score(&r, None);
        assert!(scored.confidence.score < 0.35, "{}", scored.confidence.score);
        assert_eq!(scored.confidence.level, ConfidenceLevel::VeryLow);
        assert!(scored.confidence.factors.iter().any(|f| f == "slow response"));
    }

    #[test]
    fn test_scores_within_bounds() {
        let very_long = "Because data shows 42% gains, however evidence varies. ".repeat(200);
        for content in ["a", RICH, very_long.as_str()] {
            let r = ProviderResponse::fulfilled("gpt4o", Model::Gpt4o, content, 0);
            let s = scorer().score(&r, None).confidence.score;
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_semantic_blend() {
        let r = ProviderResponse::fulfilled("x", Model::Custom("local".into()), "yes", 7_000);
        let structural = scorer().score(&r, None).confidence.score;
        let semantic = SemanticConfidence {
            score: 1.0,
            components: BTreeMap::new(),
        };
        let blended = scorer().score(&r, Some(&semantic));
        let expected = 0.7 * 1.0 + 0.3 * structural;
        assert!((blended.confidence.score - expected).abs() < 1e-9);
        assert_eq!(blended.semantic, Some(1.0));
    }

    #[test]
    fn test_deterministic() {
        let r = ProviderResponse::fulfilled("claude", Model::ClaudeSonnet4, RICH, 2_500);
        assert_eq!(scorer().score(&r, None), scorer().score(&r, None));
    }

    #[test]
    fn test_is_technical() {
        assert!(is_technical("serialization"));
        assert!(is_technical("HashMap"));
        assert!(is_technical("std::sync"));
        assert!(is_technical("utf8"));
        assert!(!is_technical("cat"));
    }
}
