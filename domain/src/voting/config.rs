//! Voting configuration tables.

use crate::core::model::Vendor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Responses faster than `below_ms` get `multiplier`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBand {
    pub below_ms: u64,
    pub multiplier: f64,
}

/// Provider-specific optimal answer length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthBand {
    pub min_words: usize,
    pub max_words: usize,
    pub inside: f64,
    pub short: f64,
    pub long: f64,
}

impl Default for LengthBand {
    fn default() -> Self {
        Self {
            min_words: 30,
            max_words: 300,
            inside: 1.05,
            short: 0.9,
            long: 0.95,
        }
    }
}

impl LengthBand {
    fn new(min_words: usize, max_words: usize) -> Self {
        Self {
            min_words,
            max_words,
            ..Self::default()
        }
    }

    pub fn multiplier_for(&self, words: usize) -> f64 {
        if words < self.min_words {
            self.short
        } else if words > self.max_words {
            self.long
        } else {
            self.inside
        }
    }
}

/// Per-role reliability multipliers. Roles missing from the table get 1.0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReliabilityTable(BTreeMap<String, f64>);

impl ReliabilityTable {
    pub fn new(entries: BTreeMap<String, f64>) -> Self {
        Self(entries)
    }

    /// Build from a historical accuracy feed: `0.8 + 0.4 * accuracy`.
    /// Non-finite accuracies are skipped.
    pub fn from_accuracy(accuracy: &HashMap<String, f64>) -> Self {
        Self(
            accuracy
                .iter()
                .filter(|(_, a)| a.is_finite())
                .map(|(role, a)| (role.clone(), 0.8 + 0.4 * a.clamp(0.0, 1.0)))
                .collect(),
        )
    }

    pub fn multiplier_for(&self, role: &str) -> f64 {
        self.0.get(role).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cut-offs for consensus grading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusThresholds {
    pub very_strong_weight: f64,
    pub very_strong_margin: f64,
    pub very_strong_entropy: f64,
    pub strong_weight: f64,
    pub strong_margin: f64,
    pub moderate_weight: f64,
    pub moderate_margin: f64,
    /// Top-3 spread below which the vote is a three-way near tie
    pub near_tie_spread: f64,
    /// Normalized entropy above which the vote is very weak
    pub high_entropy: f64,
}

impl Default for ConsensusThresholds {
    fn default() -> Self {
        Self {
            very_strong_weight: 0.6,
            very_strong_margin: 0.2,
            very_strong_entropy: 0.7,
            strong_weight: 0.55,
            strong_margin: 0.15,
            moderate_weight: 0.45,
            moderate_margin: 0.08,
            near_tie_spread: 0.15,
            high_entropy: 0.9,
        }
    }
}

/// Complete voting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Recorded in analytics so results can be traced to a table revision
    pub version: String,
    /// Ascending latency bands
    pub time_bands: Vec<TimeBand>,
    /// Multiplier for responses slower than every band
    pub slowest_multiplier: f64,
    pub length_bands: BTreeMap<Vendor, LengthBand>,
    pub reliability: ReliabilityTable,
    /// Gain applied to `uniqueness - mean uniqueness`
    pub diversity_gain: f64,
    /// Absolute bound on the diversity adjustment
    pub diversity_cap: f64,
    /// Softmax temperature
    pub temperature: f64,
    /// Top-two weight gap that triggers the tie-break
    pub tie_epsilon: f64,
    pub thresholds: ConsensusThresholds,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            version: "2.1.0".to_string(),
            time_bands: vec![
                TimeBand { below_ms: 1_000, multiplier: 1.15 },
                TimeBand { below_ms: 3_000, multiplier: 1.08 },
                TimeBand { below_ms: 6_000, multiplier: 1.0 },
                TimeBand { below_ms: 10_000, multiplier: 0.92 },
            ],
            slowest_multiplier: 0.85,
            length_bands: BTreeMap::from([
                (Vendor::OpenAi, LengthBand::new(50, 250)),
                (Vendor::Anthropic, LengthBand::new(80, 350)),
                (Vendor::Google, LengthBand::new(40, 220)),
                (Vendor::Xai, LengthBand::new(40, 200)),
                (Vendor::Other, LengthBand::default()),
            ]),
            reliability: ReliabilityTable::default(),
            diversity_gain: 0.5,
            diversity_cap: 0.15,
            temperature: 0.1,
            tie_epsilon: 0.05,
            thresholds: ConsensusThresholds::default(),
        }
    }
}

impl VotingConfig {
    pub fn time_multiplier(&self, latency_ms: u64) -> f64 {
        self.time_bands
            .iter()
            .find(|band| latency_ms < band.below_ms)
            .map(|band| band.multiplier)
            .unwrap_or(self.slowest_multiplier)
    }

    pub fn length_multiplier(&self, vendor: Vendor, words: usize) -> f64 {
        match self.length_bands.get(&vendor) {
            Some(band) => band.multiplier_for(words),
            None => LengthBand::default().multiplier_for(words),
        }
    }

    /// `1 + clamp(gain * (uniqueness - mean), -cap, +cap)`
    pub fn diversity_factor(&self, uniqueness: f64, mean: f64) -> f64 {
        let cap = self.diversity_cap.abs();
        1.0 + (self.diversity_gain * (uniqueness - mean)).clamp(-cap, cap)
    }

    pub fn with_reliability(mut self, reliability: ReliabilityTable) -> Self {
        self.reliability = reliability;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_bands() {
        let c = VotingConfig::default();
        assert_eq!(c.time_multiplier(400), 1.15);
        assert_eq!(c.time_multiplier(1_000), 1.08);
        assert_eq!(c.time_multiplier(5_999), 1.0);
        assert_eq!(c.time_multiplier(9_000), 0.92);
        assert_eq!(c.time_multiplier(30_000), 0.85);
    }

    #[test]
    fn test_length_multiplier_per_vendor() {
        let c = VotingConfig::default();
        assert_eq!(c.length_multiplier(Vendor::OpenAi, 100), 1.05);
        assert_eq!(c.length_multiplier(Vendor::Anthropic, 60), 0.9);
        assert_eq!(c.length_multiplier(Vendor::Google, 500), 0.95);
    }

    #[test]
    fn test_diversity_factor_clamped() {
        let c = VotingConfig::default();
        assert!((c.diversity_factor(0.5, 0.5) - 1.0).abs() < 1e-12);
        assert!((c.diversity_factor(0.6, 0.4) - 1.1).abs() < 1e-12);
        assert!((c.diversity_factor(1.0, 0.0) - 1.15).abs() < 1e-12);
        assert!((c.diversity_factor(0.0, 1.0) - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_reliability_from_accuracy() {
        let feed = HashMap::from([
            ("gpt4o".to_string(), 1.0),
            ("claude".to_string(), 0.5),
            ("broken".to_string(), f64::NAN),
        ]);
        let table = ReliabilityTable::from_accuracy(&feed);
        assert!((table.multiplier_for("gpt4o") - 1.2).abs() < 1e-12);
        assert!((table.multiplier_for("claude") - 1.0).abs() < 1e-12);
        assert_eq!(table.multiplier_for("broken"), 1.0);
        assert_eq!(table.len(), 2);
    }
}
