//! Pipeline configuration container.
//!
//! Use cases read only the tables they need. Everything here is fixed for
//! the lifetime of a [`RunEnsembleUseCase`](crate::RunEnsembleUseCase)
//! except the reliability table, which
//! [`refresh_reliability`](crate::RunEnsembleUseCase::refresh_reliability)
//! may swap.

use super::CacheSettings;
use ensemble_domain::{
    AbstentionConfig, DiversityWeights, RequeryStrategyTable, ScoringConfig, SynthesisConfig,
    Tier, TierConfig, VotingConfig,
};
use std::time::Duration;

/// Provider slots and budgets per tier
#[derive(Debug, Clone, PartialEq)]
pub struct TierSettings {
    pub free: TierConfig,
    pub premium: TierConfig,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            free: TierConfig::free(),
            premium: TierConfig::premium(),
        }
    }
}

impl TierSettings {
    pub fn get(&self, tier: Tier) -> &TierConfig {
        match tier {
            Tier::Free => &self.free,
            Tier::Premium => &self.premium,
        }
    }
}

/// Whole-request behavior
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Aggregate budget for dispatch, meta-voting and synthesis
    pub deadline: Duration,
    /// Ask the synthesizer to arbitrate when consensus is weak
    pub meta_voting: bool,
    pub meta_vote_max_tokens: u32,
    /// Bound on memory lookups and semantic scoring, within the deadline
    pub auxiliary_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            meta_voting: true,
            meta_vote_max_tokens: 200,
            auxiliary_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleConfig {
    pub tiers: TierSettings,
    pub scoring: ScoringConfig,
    pub diversity: DiversityWeights,
    pub voting: VotingConfig,
    pub synthesis: SynthesisConfig,
    pub abstention: AbstentionConfig,
    pub strategies: RequeryStrategyTable,
    pub cache: CacheSettings,
    pub pipeline: PipelineSettings,
}

impl EnsembleConfig {
    pub fn with_tier(mut self, tier: TierConfig) -> Self {
        match tier.tier {
            Tier::Free => self.tiers.free = tier,
            Tier::Premium => self.tiers.premium = tier,
        }
        self
    }

    pub fn with_abstention(mut self, abstention: AbstentionConfig) -> Self {
        self.abstention = abstention;
        self
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineSettings) -> Self {
        self.pipeline = pipeline;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::ProviderSlot;
    use ensemble_domain::Model;

    #[test]
    fn test_with_tier_replaces_matching_tier() {
        let tier = TierConfig::free().with_slots(vec![ProviderSlot::new("solo", Model::Gpt4o)]);
        let config = EnsembleConfig::default().with_tier(tier);
        assert_eq!(config.tiers.get(Tier::Free).slots.len(), 1);
        assert_eq!(config.tiers.get(Tier::Premium).slots.len(), 3);
    }
}
