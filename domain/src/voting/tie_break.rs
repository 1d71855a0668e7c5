//! Near-tie resolution between the two top-weighted providers.

use serde::{Deserialize, Serialize};

/// Record of a tie-break decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieBreakRecord {
    pub original_winner: String,
    pub final_winner: String,
    /// Weight gap between the two candidates
    pub gap: f64,
    pub reasoning: String,
}

impl TieBreakRecord {
    pub fn changed_winner(&self) -> bool {
        self.original_winner != self.final_winner
    }
}

/// One side of a tie-break
#[derive(Debug, Clone, Copy)]
pub struct Contender<'a> {
    pub role: &'a str,
    /// Position in slot order
    pub slot: usize,
    pub weight: f64,
    pub uniqueness: f64,
    pub confidence: f64,
}

const EPS: f64 = 1e-9;

/// Re-rank the leader and the runner-up when their weights are within
/// `epsilon`: higher uniqueness wins, then higher confidence, then earlier
/// slot. Returns `None` when the gap is not a tie.
pub fn resolve(leader: Contender<'_>, runner_up: Contender<'_>, epsilon: f64) -> Option<TieBreakRecord> {
    let gap = (leader.weight - runner_up.weight).abs();
    if gap >= epsilon {
        return None;
    }

    let (winner, reasoning) = if (leader.uniqueness - runner_up.uniqueness).abs() > EPS {
        let winner = if leader.uniqueness > runner_up.uniqueness {
            leader
        } else {
            runner_up
        };
        (
            winner,
            format!(
                "weights within {:.3}; '{}' contributes more unique content ({:.3} vs {:.3})",
                gap,
                winner.role,
                leader.uniqueness.max(runner_up.uniqueness),
                leader.uniqueness.min(runner_up.uniqueness)
            ),
        )
    } else if (leader.confidence - runner_up.confidence).abs() > EPS {
        let winner = if leader.confidence > runner_up.confidence {
            leader
        } else {
            runner_up
        };
        (
            winner,
            format!(
                "weights within {:.3} and equal uniqueness; '{}' has higher confidence",
                gap, winner.role
            ),
        )
    } else {
        let winner = if leader.slot <= runner_up.slot {
            leader
        } else {
            runner_up
        };
        (
            winner,
            format!(
                "weights within {:.3} with equal uniqueness and confidence; '{}' comes first in slot order",
                gap, winner.role
            ),
        )
    };

    Some(TieBreakRecord {
        original_winner: leader.role.to_string(),
        final_winner: winner.role.to_string(),
        gap,
        reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contender(role: &str, slot: usize, weight: f64, uniqueness: f64, confidence: f64) -> Contender<'_> {
        Contender {
            role,
            slot,
            weight,
            uniqueness,
            confidence,
        }
    }

    #[test]
    fn test_no_tie() {
        let a = contender("a", 0, 0.6, 0.1, 0.9);
        let b = contender("b", 1, 0.4, 0.9, 0.9);
        assert!(resolve(a, b, 0.05).is_none());
    }

    #[test]
    fn test_uniqueness_decides() {
        let a = contender("a", 0, 0.51, 0.1, 0.9);
        let b = contender("b", 1, 0.49, 0.4, 0.8);
        let record = resolve(a, b, 0.05).unwrap();
        assert_eq!(record.original_winner, "a");
        assert_eq!(record.final_winner, "b");
        assert!(record.changed_winner());
        assert!(record.reasoning.contains("unique"));
    }

    #[test]
    fn test_confidence_then_slot() {
        let a = contender("a", 0, 0.5, 0.2, 0.7);
        let b = contender("b", 1, 0.5, 0.2, 0.8);
        assert_eq!(resolve(a, b, 0.05).unwrap().final_winner, "b");

        let a = contender("a", 0, 0.5, 0.2, 0.8);
        let b = contender("b", 1, 0.5, 0.2, 0.8);
        let record = resolve(a, b, 0.05).unwrap();
        assert_eq!(record.final_winner, "a");
        assert!(!record.changed_winner());
    }
}
