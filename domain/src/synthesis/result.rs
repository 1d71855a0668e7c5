//! Synthesis candidates, results and confidence.

use super::config::SynthesisConfig;
use crate::core::model::Model;
use crate::core::text;
use crate::scoring::ScoredResponse;
use crate::scoring::quality;
use crate::voting::{ConsensusGrade, VotingResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisStatus {
    Success,
    Fallback,
    Error,
}

impl std::fmt::Display for SynthesisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisStatus::Success => write!(f, "success"),
            SynthesisStatus::Fallback => write!(f, "fallback"),
            SynthesisStatus::Error => write!(f, "error"),
        }
    }
}

/// A fulfilled response offered to the synthesizer
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisCandidate {
    pub role: String,
    pub model: Model,
    pub content: String,
    pub weight: f64,
    pub confidence: f64,
}

/// Fulfilled responses ordered by descending vote weight. Equal weights keep
/// slot order.
pub fn candidates(scored: &[ScoredResponse], voting: &VotingResult) -> Vec<SynthesisCandidate> {
    let mut out: Vec<SynthesisCandidate> = scored
        .iter()
        .filter(|s| s.is_fulfilled())
        .map(|s| SynthesisCandidate {
            role: s.response.role.clone(),
            model: s.response.model.clone(),
            content: s.response.content.clone(),
            weight: voting.weight_of(&s.response.role),
            confidence: s.confidence.score,
        })
        .collect();
    out.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    out
}

/// The unified answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResult {
    pub content: String,
    pub status: SynthesisStatus,
    pub confidence: f64,
    /// Synthesizer model, absent for fallbacks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SynthesisResult {
    /// A successful synthesis, scored against its sources
    pub fn success(
        content: impl Into<String>,
        model: Model,
        sources: &[SynthesisCandidate],
        diversity: f64,
        consensus: ConsensusGrade,
        config: &SynthesisConfig,
    ) -> Self {
        let content = content.into();
        let confidence = confidence(&content, sources, diversity, consensus, config);
        Self {
            content,
            status: SynthesisStatus::Success,
            confidence,
            model: Some(model),
            fallback_used: false,
            error: None,
        }
    }

    /// Deterministic composition used when the synthesizer is unavailable.
    ///
    /// One source passes through verbatim; several are concatenated in the
    /// given (weight) order. No sources yields [`SynthesisResult::error`].
    pub fn fallback(sources: &[SynthesisCandidate], reason: impl Into<String>, config: &SynthesisConfig) -> Self {
        let reason = reason.into();
        let content = match sources {
            [] => return Self::error(reason),
            [only] => only.content.clone(),
            many => many
                .iter()
                .map(|c| format!("[{}]\n{}", c.role, c.content.trim()))
                .collect::<Vec<_>>()
                .join("\n\n"),
        };
        Self {
            content,
            status: SynthesisStatus::Fallback,
            confidence: (config.fallback_factor * mean_confidence(sources)).clamp(0.0, 1.0),
            model: None,
            fallback_used: true,
            error: Some(reason),
        }
    }

    /// Nothing to synthesize from
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            status: SynthesisStatus::Error,
            confidence: 0.0,
            model: None,
            fallback_used: false,
            error: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SynthesisStatus::Success
    }
}

/// Confidence of a synthesized answer:
/// source confidence + own quality + agreement + novelty, adjusted by
/// consensus strength.
pub fn confidence(
    content: &str,
    sources: &[SynthesisCandidate],
    diversity: f64,
    consensus: ConsensusGrade,
    config: &SynthesisConfig,
) -> f64 {
    let mut score = config.source_weight * mean_confidence(sources);
    score += quality_credit(content, config);
    score += config.agreement_weight * (1.0 - diversity.clamp(0.0, 1.0));
    score += config.uniqueness_bonus * novelty(content, sources);

    let adjusted = if consensus.is_strong() {
        score * (1.0 + config.consensus_adjustment)
    } else if consensus.is_weak() {
        score * (1.0 - config.consensus_adjustment)
    } else {
        score
    };
    adjusted.clamp(0.0, 1.0)
}

/// Length, structure and reasoning credit, at most 0.1 each
fn quality_credit(content: &str, config: &SynthesisConfig) -> f64 {
    let words = text::words(content).len();
    let length = if words == 0 {
        0.0
    } else if words < config.min_words {
        0.1 * words as f64 / config.min_words.max(1) as f64
    } else if words <= config.max_words {
        0.1
    } else {
        0.1 * config.max_words as f64 / words as f64
    };

    let structure = if quality::has_structure(content) {
        0.1
    } else if text::sentences(content).len() >= 2 {
        0.05
    } else {
        0.0
    };

    let reasoning = if quality::has_reasoning(content) { 0.1 } else { 0.0 };

    length + structure + reasoning
}

/// `1 - max keyword overlap` with any source
fn novelty(content: &str, sources: &[SynthesisCandidate]) -> f64 {
    let own = text::keywords(content);
    let max_overlap = sources
        .iter()
        .map(|s| text::jaccard(&own, &text::keywords(&s.content)))
        .fold(0.0, f64::max);
    (1.0 - max_overlap).clamp(0.0, 1.0)
}

fn mean_confidence(sources: &[SynthesisCandidate]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    sources.iter().map(|s| s.confidence).sum::<f64>() / sources.len() as f64
}
