//! Synthesis budgets and confidence weights.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Character budget for each candidate inside the composition prompt
    pub per_response_chars: usize,
    /// Character budget for all candidates together
    pub total_chars: usize,
    /// Word window that earns the full length credit
    pub min_words: usize,
    pub max_words: usize,
    pub source_weight: f64,
    pub agreement_weight: f64,
    pub uniqueness_bonus: f64,
    /// Relative adjustment for strong or weak consensus
    pub consensus_adjustment: f64,
    /// Fallback confidence as a share of the mean source confidence
    pub fallback_factor: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            per_response_chars: 2_000,
            total_chars: 6_000,
            min_words: 80,
            max_words: 400,
            source_weight: 0.6,
            agreement_weight: 0.2,
            uniqueness_bonus: 0.08,
            consensus_adjustment: 0.1,
            fallback_factor: 0.8,
        }
    }
}
