//! Weighted voting over scored responses.

use super::config::VotingConfig;
use super::consensus::{self, ConsensusGrade, Distribution};
use super::error::VotingError;
use super::tie_break::{self, Contender, TieBreakRecord};
use super::weights::{self, WeightFactors};
use crate::diversity::DiversityResult;
use crate::scoring::ScoredResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics recorded alongside every vote
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingAnalytics {
    pub entropy: f64,
    pub margin: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top3_spread: Option<f64>,
    pub fulfilled: usize,
    pub rejected: usize,
    pub average_confidence: f64,
    pub diversity: f64,
    pub config_version: String,
    /// Per-provider multipliers behind the raw weights
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub factors: BTreeMap<String, WeightFactors>,
}

/// Outcome of a vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingResult {
    /// `None` only when no provider fulfilled
    pub winner: Option<String>,
    /// Weight of the winner
    pub confidence: f64,
    pub consensus: ConsensusGrade,
    /// Normalized weights of fulfilled providers
    pub weights: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tie_breaking: Option<TieBreakRecord>,
    pub analytics: VotingAnalytics,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VotingResult {
    /// Result when nothing fulfilled
    pub fn empty(config_version: impl Into<String>) -> Self {
        Self {
            winner: None,
            confidence: 0.0,
            consensus: ConsensusGrade::None,
            weights: BTreeMap::new(),
            tie_breaking: None,
            analytics: VotingAnalytics {
                config_version: config_version.into(),
                ..VotingAnalytics::default()
            },
            fallback_used: false,
            error: None,
        }
    }

    pub fn weight_of(&self, role: &str) -> f64 {
        self.weights.get(role).copied().unwrap_or(0.0)
    }

    /// Fulfilled roles ordered by descending weight (ties by role name)
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> =
            self.weights.iter().map(|(r, w)| (r.as_str(), *w)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Voting/consensus engine.
///
/// Never fails: internal errors select equal-weight fallback voting, which
/// is flagged on the result.
#[derive(Debug, Clone, Default)]
pub struct VotingEngine {
    config: VotingConfig,
}

impl VotingEngine {
    pub fn new(config: VotingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// Vote over responses given in slot order.
    pub fn vote(&self, scored: &[ScoredResponse], diversity: &DiversityResult) -> VotingResult {
        match self.try_vote(scored, diversity) {
            Ok(result) => result,
            Err(e) => self.fallback(scored, diversity, &e),
        }
    }

    /// Strict variant used by [`vote`](Self::vote)
    pub fn try_vote(
        &self,
        scored: &[ScoredResponse],
        diversity: &DiversityResult,
    ) -> Result<VotingResult, VotingError> {
        let fulfilled: Vec<(usize, &ScoredResponse)> = scored
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_fulfilled())
            .collect();
        if fulfilled.is_empty() {
            let mut empty = VotingResult::empty(&self.config.version);
            empty.analytics.rejected = scored.len();
            return Ok(empty);
        }

        let factors: Vec<WeightFactors> = fulfilled
            .iter()
            .map(|(_, s)| WeightFactors::compute(s, diversity, &self.config))
            .collect();
        let raw: Vec<(String, f64)> = fulfilled
            .iter()
            .zip(&factors)
            .map(|((_, s), f)| (s.role().to_string(), f.raw))
            .collect();
        let normalized = weights::softmax(&raw, self.config.temperature)?;

        let contenders: Vec<Contender<'_>> = fulfilled
            .iter()
            .zip(&normalized)
            .map(|((slot, s), w)| Contender {
                role: s.role(),
                slot: *slot,
                weight: *w,
                uniqueness: diversity.uniqueness_of(s.role()),
                confidence: s.confidence.score,
            })
            .collect();

        let Some(leader) = top_by_weight(&contenders, None) else {
            return Err(VotingError::ZeroMass);
        };
        let runner_up = top_by_weight(&contenders, Some(leader));
        let tie_breaking = runner_up.and_then(|r| {
            tie_break::resolve(contenders[leader], contenders[r], self.config.tie_epsilon)
        });
        let winner = tie_breaking
            .as_ref()
            .map(|t| t.final_winner.clone())
            .unwrap_or_else(|| contenders[leader].role.to_string());

        let weights: BTreeMap<String, f64> = raw
            .iter()
            .zip(&normalized)
            .map(|((role, _), w)| (role.clone(), *w))
            .collect();
        let confidence = weights.get(&winner).copied().unwrap_or(0.0);

        let distribution = Distribution::of(&normalized);
        let consensus = consensus::grade(distribution.as_ref(), &self.config.thresholds);

        let analytics = self.analytics(
            scored,
            &fulfilled,
            diversity,
            distribution.as_ref(),
            raw.iter().map(|(r, _)| r.clone()).zip(factors).collect(),
        );

        Ok(VotingResult {
            winner: Some(winner),
            confidence,
            consensus,
            weights,
            tie_breaking,
            analytics,
            fallback_used: false,
            error: None,
        })
    }

    /// Equal-weight voting: first fulfilled provider wins with confidence 0.5
    /// and weak consensus.
    pub fn fallback(
        &self,
        scored: &[ScoredResponse],
        diversity: &DiversityResult,
        error: &VotingError,
    ) -> VotingResult {
        let fulfilled: Vec<(usize, &ScoredResponse)> = scored
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_fulfilled())
            .collect();

        let mut result = VotingResult::empty(&self.config.version);
        result.fallback_used = true;
        result.error = Some(error.to_string());
        result.analytics.rejected = scored.len();

        let Some((_, first)) = fulfilled.first() else {
            return result;
        };

        let equal = 1.0 / fulfilled.len() as f64;
        let normalized = vec![equal; fulfilled.len()];
        let distribution = Distribution::of(&normalized);

        result.winner = Some(first.role().to_string());
        result.confidence = 0.5;
        result.consensus = ConsensusGrade::Weak;
        result.weights = fulfilled
            .iter()
            .map(|(_, s)| (s.role().to_string(), equal))
            .collect();
        result.analytics =
            self.analytics(scored, &fulfilled, diversity, distribution.as_ref(), BTreeMap::new());
        result
    }

    fn analytics(
        &self,
        scored: &[ScoredResponse],
        fulfilled: &[(usize, &ScoredResponse)],
        diversity: &DiversityResult,
        distribution: Option<&Distribution>,
        factors: BTreeMap<String, WeightFactors>,
    ) -> VotingAnalytics {
        let average_confidence = if fulfilled.is_empty() {
            0.0
        } else {
            fulfilled.iter().map(|(_, s)| s.confidence.score).sum::<f64>() / fulfilled.len() as f64
        };
        VotingAnalytics {
            entropy: distribution.map(|d| d.entropy).unwrap_or(0.0),
            margin: distribution.map(|d| d.margin).unwrap_or(0.0),
            top3_spread: distribution.and_then(|d| d.top3_spread),
            fulfilled: fulfilled.len(),
            rejected: scored.len() - fulfilled.len(),
            average_confidence,
            diversity: diversity.overall,
            config_version: self.config.version.clone(),
            factors,
        }
    }
}

/// Index of the highest weight, skipping `exclude`. Earlier slots win exact
/// ties.
fn top_by_weight(contenders: &[Contender<'_>], exclude: Option<usize>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, c) in contenders.iter().enumerate() {
        if Some(i) == exclude {
            continue;
        }
        match best {
            Some(b) if contenders[b].weight >= c.weight => {}
            _ => best = Some(i),
        }
    }
    best
}
