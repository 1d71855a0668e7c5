//! Scoring configuration tables.
//!
//! Every heuristic constant used by [`ConfidenceScorer`](super::ConfidenceScorer)
//! is named here so it can be overridden per deployment without touching code.

use crate::core::model::Vendor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Optimal word-count window and the credit given around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthWindow {
    pub min_words: usize,
    pub max_words: usize,
    /// Bonus inside the window
    pub bonus: f64,
    /// Minimum partial credit above the window
    pub floor: f64,
}

impl Default for LengthWindow {
    fn default() -> Self {
        Self {
            min_words: 30,
            max_words: 150,
            bonus: 0.2,
            floor: 0.05,
        }
    }
}

impl LengthWindow {
    /// Length-band bonus for a word count
    pub fn bonus_for(&self, words: usize) -> f64 {
        if words == 0 {
            return 0.0;
        }
        if words < self.min_words {
            self.bonus * words as f64 / self.min_words.max(1) as f64
        } else if words <= self.max_words {
            self.bonus
        } else {
            (self.bonus * self.max_words as f64 / words as f64).max(self.floor)
        }
    }
}

/// Latency bands (milliseconds) and their score adjustments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyAdjustment {
    pub fast_ms: u64,
    pub fast_bonus: f64,
    pub moderate_ms: u64,
    pub moderate_bonus: f64,
    pub slow_ms: u64,
    pub slow_penalty: f64,
}

impl Default for LatencyAdjustment {
    fn default() -> Self {
        Self {
            fast_ms: 2_000,
            fast_bonus: 0.07,
            moderate_ms: 5_000,
            moderate_bonus: 0.03,
            slow_ms: 10_000,
            slow_penalty: 0.07,
        }
    }
}

impl LatencyAdjustment {
    pub fn adjustment_for(&self, latency_ms: u64) -> f64 {
        if latency_ms < self.fast_ms {
            self.fast_bonus
        } else if latency_ms < self.moderate_ms {
            self.moderate_bonus
        } else if latency_ms > self.slow_ms {
            -self.slow_penalty
        } else {
            0.0
        }
    }
}

/// Confidence level cut-offs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            high: 0.75,
            medium: 0.55,
            low: 0.35,
        }
    }
}

/// Complete scorer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base: f64,
    pub length: LengthWindow,
    pub structure_cap: f64,
    pub sophistication_cap: f64,
    /// Long-word ratio above which the technical-term bonus applies
    pub technical_density: f64,
    pub latency: LatencyAdjustment,
    /// Additive prior per vendor
    pub reliability_priors: BTreeMap<Vendor, f64>,
    /// Share of the semantic signal when one is available
    pub semantic_weight: f64,
    pub levels: LevelThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: 0.3,
            length: LengthWindow::default(),
            structure_cap: 0.2,
            sophistication_cap: 0.25,
            technical_density: 0.08,
            latency: LatencyAdjustment::default(),
            reliability_priors: BTreeMap::from([
                (Vendor::OpenAi, 0.05),
                (Vendor::Anthropic, 0.05),
                (Vendor::Google, 0.04),
                (Vendor::Xai, 0.03),
                (Vendor::Other, 0.0),
            ]),
            semantic_weight: 0.7,
            levels: LevelThresholds::default(),
        }
    }
}

impl ScoringConfig {
    pub fn prior_for(&self, vendor: Vendor) -> f64 {
        self.reliability_priors.get(&vendor).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_window() {
        let w = LengthWindow::default();
        assert_eq!(w.bonus_for(0), 0.0);
        assert!((w.bonus_for(15) - 0.1).abs() < 1e-9);
        assert_eq!(w.bonus_for(30), 0.2);
        assert_eq!(w.bonus_for(150), 0.2);
        assert!((w.bonus_for(300) - 0.1).abs() < 1e-9);
        assert_eq!(w.bonus_for(10_000), 0.05);
    }

    #[test]
    fn test_latency_bands() {
        let l = LatencyAdjustment::default();
        assert_eq!(l.adjustment_for(500), 0.07);
        assert_eq!(l.adjustment_for(3_000), 0.03);
        assert_eq!(l.adjustment_for(7_000), 0.0);
        assert_eq!(l.adjustment_for(11_000), -0.07);
    }

    #[test]
    fn test_priors() {
        let c = ScoringConfig::default();
        assert_eq!(c.prior_for(Vendor::OpenAi), 0.05);
        assert_eq!(c.prior_for(Vendor::Other), 0.0);
    }

    #[test]
    fn test_partial_toml_like_override() {
        let json = r#"{"base": 0.25, "length": {"min_words": 10}}"#;
        let c: ScoringConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.base, 0.25);
        assert_eq!(c.length.min_words, 10);
        assert_eq!(c.length.max_words, 150);
        assert_eq!(c.semantic_weight, 0.7);
    }
}
