//! Consensus grading from a normalized weight distribution.

use super::config::ConsensusThresholds;
use serde::{Deserialize, Serialize};

/// How strongly the weights agree on the winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsensusGrade {
    /// Nothing fulfilled
    None,
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl ConsensusGrade {
    pub const ALL: [ConsensusGrade; 6] = [
        ConsensusGrade::None,
        ConsensusGrade::VeryWeak,
        ConsensusGrade::Weak,
        ConsensusGrade::Moderate,
        ConsensusGrade::Strong,
        ConsensusGrade::VeryStrong,
    ];

    /// Numeric strength used by the abstention gate
    pub fn strength(&self) -> f64 {
        match self {
            ConsensusGrade::VeryStrong => 1.0,
            ConsensusGrade::Strong => 0.8,
            ConsensusGrade::Moderate => 0.6,
            ConsensusGrade::Weak => 0.4,
            ConsensusGrade::VeryWeak => 0.2,
            ConsensusGrade::None => 0.0,
        }
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, ConsensusGrade::Strong | ConsensusGrade::VeryStrong)
    }

    pub fn is_weak(&self) -> bool {
        matches!(self, ConsensusGrade::Weak | ConsensusGrade::VeryWeak)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusGrade::None => "none",
            ConsensusGrade::VeryWeak => "very-weak",
            ConsensusGrade::Weak => "weak",
            ConsensusGrade::Moderate => "moderate",
            ConsensusGrade::Strong => "strong",
            ConsensusGrade::VeryStrong => "very-strong",
        }
    }
}

impl std::fmt::Display for ConsensusGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape statistics of a weight distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    pub top: f64,
    /// Top weight minus second weight; the top weight itself with one entry
    pub margin: f64,
    /// Top weight minus third weight, when at least three entries exist
    pub top3_spread: Option<f64>,
    /// Shannon entropy normalized by `ln n`; 0 for a single entry
    pub entropy: f64,
}

impl Distribution {
    /// `None` for an empty distribution
    pub fn of(weights: &[f64]) -> Option<Self> {
        if weights.is_empty() {
            return None;
        }
        let mut sorted = weights.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));

        let top = sorted[0];
        let margin = sorted.get(1).map(|second| top - second).unwrap_or(top);
        let top3_spread = sorted.get(2).map(|third| top - third);

        let n = sorted.len();
        let entropy = if n < 2 {
            0.0
        } else {
            let h: f64 = sorted
                .iter()
                .filter(|w| **w > 0.0)
                .map(|w| -w * w.ln())
                .sum();
            (h / (n as f64).ln()).clamp(0.0, 1.0)
        };

        Some(Self {
            top,
            margin,
            top3_spread,
            entropy,
        })
    }
}

/// Grade a distribution. Checked in order: very-strong, strong, moderate,
/// very-weak, otherwise weak.
pub fn grade(distribution: Option<&Distribution>, t: &ConsensusThresholds) -> ConsensusGrade {
    let Some(d) = distribution else {
        return ConsensusGrade::None;
    };

    if d.top > t.very_strong_weight
        && d.margin > t.very_strong_margin
        && d.entropy < t.very_strong_entropy
    {
        ConsensusGrade::VeryStrong
    } else if d.top > t.strong_weight && d.margin > t.strong_margin {
        ConsensusGrade::Strong
    } else if d.top > t.moderate_weight && d.margin > t.moderate_margin {
        ConsensusGrade::Moderate
    } else if d.top3_spread.is_some_and(|s| s < t.near_tie_spread) || d.entropy > t.high_entropy {
        ConsensusGrade::VeryWeak
    } else {
        ConsensusGrade::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade_of(weights: &[f64]) -> ConsensusGrade {
        grade(Distribution::of(weights).as_ref(), &ConsensusThresholds::default())
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(grade_of(&[]), ConsensusGrade::None);
    }

    #[test]
    fn test_single_is_very_strong() {
        let d = Distribution::of(&[1.0]).unwrap();
        assert_eq!(d.entropy, 0.0);
        assert_eq!(d.margin, 1.0);
        assert_eq!(grade_of(&[1.0]), ConsensusGrade::VeryStrong);
    }

    #[test]
    fn test_grades() {
        assert_eq!(grade_of(&[0.8, 0.15, 0.05]), ConsensusGrade::VeryStrong);
        assert_eq!(grade_of(&[0.58, 0.42]), ConsensusGrade::Strong);
        assert_eq!(grade_of(&[0.5, 0.4, 0.1]), ConsensusGrade::Moderate);
        assert_eq!(grade_of(&[0.36, 0.33, 0.31]), ConsensusGrade::VeryWeak);
        assert_eq!(grade_of(&[0.52, 0.48]), ConsensusGrade::VeryWeak);
        assert_eq!(grade_of(&[0.44, 0.26, 0.25, 0.05]), ConsensusGrade::Weak);
    }

    #[test]
    fn test_monotonic_in_top_weight() {
        let mut last = ConsensusGrade::None;
        for step in 0..=10 {
            let top = 0.5 + step as f64 * 0.05;
            let rest = (1.0 - top) / 2.0;
            let g = grade_of(&[top, rest, rest]);
            assert!(g >= last || last == ConsensusGrade::None, "{} < {}", g, last);
            last = g;
        }
        assert_eq!(last, ConsensusGrade::VeryStrong);
    }

    #[test]
    fn test_strength_table() {
        assert_eq!(ConsensusGrade::VeryStrong.strength(), 1.0);
        assert_eq!(ConsensusGrade::Weak.strength(), 0.4);
        assert_eq!(ConsensusGrade::None.strength(), 0.0);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ConsensusGrade::VeryWeak).unwrap();
        assert_eq!(json, "\"very-weak\"");
    }
}
