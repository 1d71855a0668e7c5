//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Tables that the domain already models (scoring, voting, diversity,
//! synthesis, abstention) are deserialized straight into domain types; the
//! remaining sections carry file-friendly shapes (seconds, strings) and are
//! resolved with their issues collected.

mod cache;
mod output;
mod pipeline;
mod providers;
mod tiers;

pub use cache::FileCacheConfig;
pub use output::FileOutputConfig;
pub use pipeline::FilePipelineConfig;
pub use providers::{FileAnthropicConfig, FileOpenAiConfig, FileProvidersConfig};
pub use tiers::{FileSlotConfig, FileTierConfig, FileTiersConfig};

use ensemble_application::EnsembleConfig;
use ensemble_domain::{
    AbstentionConfig, ConfigIssue, ConfigIssueCode, DiversityWeights, ProviderConfig,
    RequeryStrategyTable, ScoringConfig, SynthesisConfig, Tier, VotingConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const WEIGHT_TOLERANCE: f64 = 1e-3;

/// `[abstention]` plus its `[abstention.strategies]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAbstentionConfig {
    #[serde(flatten)]
    pub gate: AbstentionConfig,
    pub strategies: RequeryStrategyTable,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// API endpoints and credentials
    pub providers: FileProvidersConfig,
    /// Provider slots and budgets per tier
    pub tiers: FileTiersConfig,
    pub scoring: ScoringConfig,
    pub diversity: DiversityWeights,
    pub voting: VotingConfig,
    pub synthesis: SynthesisConfig,
    pub abstention: FileAbstentionConfig,
    pub cache: FileCacheConfig,
    pub pipeline: FilePipelineConfig,
    pub output: FileOutputConfig,
}

/// Store layout derived from `[cache]`
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStoreSettings {
    pub directory: Option<PathBuf>,
    pub memory_capacity: usize,
    pub compress_min_bytes: usize,
}

/// Everything the binary needs, resolved from a [`FileConfig`]
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub ensemble: EnsembleConfig,
    pub providers: ProviderConfig,
    pub cache_store: CacheStoreSettings,
    /// Non-fatal issues found while resolving
    pub warnings: Vec<ConfigIssue>,
}

/// The configuration has at least one error-severity issue.
#[derive(Error, Debug)]
#[error("invalid configuration: {}", .issues.iter().map(|i| i.message.as_str()).collect::<Vec<_>>().join("; "))]
pub struct ConfigValidationError {
    pub issues: Vec<ConfigIssue>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        self.to_ensemble_config().1
            .into_iter()
            .chain(self.providers.to_provider_config().1)
            .collect()
    }

    /// Build the pipeline configuration. Invalid values fall back to their
    /// defaults and are reported.
    pub fn to_ensemble_config(&self) -> (EnsembleConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (free, free_issues) = self.tiers.free.to_tier_config(Tier::Free);
        issues.extend(free_issues);
        let (premium, premium_issues) = self.tiers.premium.to_tier_config(Tier::Premium);
        issues.extend(premium_issues);
        let (cache, cache_issues) = self.cache.to_settings();
        issues.extend(cache_issues);
        let (pipeline, pipeline_issues) = self.pipeline.to_settings();
        issues.extend(pipeline_issues);

        issues.extend(self.check_weights());
        issues.extend(self.check_ranges());

        if !self.abstention.gate.enabled
            && self.abstention.strategies != RequeryStrategyTable::default()
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::DeadSection {
                    section: "abstention.strategies".into(),
                },
                "[abstention.strategies] is configured but abstention is disabled",
            ));
        }

        let mut config = EnsembleConfig {
            scoring: self.scoring.clone(),
            diversity: self.diversity.clone(),
            voting: self.voting.clone(),
            synthesis: self.synthesis.clone(),
            abstention: self.abstention.gate.clone(),
            strategies: self.abstention.strategies.clone(),
            cache,
            pipeline,
            ..EnsembleConfig::default()
        };
        config.tiers.free = free;
        config.tiers.premium = premium;
        if !(0.0..=1.0).contains(&config.scoring.semantic_weight) {
            config.scoring.semantic_weight = ScoringConfig::default().semantic_weight;
        }
        if config.voting.temperature <= 0.0 {
            config.voting.temperature = VotingConfig::default().temperature;
        }

        (config, issues)
    }

    /// Resolve everything, failing when any issue is an error.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigValidationError> {
        let (ensemble, mut issues) = self.to_ensemble_config();
        let (providers, provider_issues) = self.providers.to_provider_config();
        issues.extend(provider_issues);

        let (errors, warnings): (Vec<_>, Vec<_>) = issues.into_iter().partition(|i| i.is_error());
        if !errors.is_empty() {
            return Err(ConfigValidationError { issues: errors });
        }

        Ok(ResolvedConfig {
            ensemble,
            providers,
            cache_store: CacheStoreSettings {
                directory: self.cache.directory.clone(),
                memory_capacity: self.cache.memory_capacity.max(1),
                compress_min_bytes: self.cache.compress_min_bytes,
            },
            warnings,
        })
    }

    fn check_weights(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let diversity = self.diversity.total();
        if (diversity - 1.0).abs() > WEIGHT_TOLERANCE {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::WeightsNotNormalized {
                    section: "diversity".into(),
                },
                format!("diversity: weights sum to {:.3}, expected 1.0", diversity),
            ));
        }
        let q = &self.abstention.gate.quality;
        let quality = q.success_rate
            + q.confidence
            + q.consensus
            + q.voting_confidence
            + q.semantic
            + q.agreement;
        if (quality - 1.0).abs() > WEIGHT_TOLERANCE {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::WeightsNotNormalized {
                    section: "abstention.quality".into(),
                },
                format!(
                    "abstention.quality: weights sum to {:.3}, expected 1.0",
                    quality
                ),
            ));
        }
        issues
    }

    fn check_ranges(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut unit = |field: &str, value: f64| {
            if !(0.0..=1.0).contains(&value) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::OutOfRange {
                        field: field.to_string(),
                    },
                    format!("{}: {} is outside [0, 1]", field, value),
                ));
            }
        };
        let gate = &self.abstention.gate;
        unit("scoring.semantic_weight", self.scoring.semantic_weight);
        unit("abstention.min_voting_confidence", gate.min_voting_confidence);
        unit("abstention.max_failure_rate", gate.max_failure_rate);
        unit("abstention.min_quality", gate.min_quality);
        unit("abstention.high_diversity", gate.high_diversity);
        unit("abstention.low_consensus_strength", gate.low_consensus_strength);

        if self.voting.temperature <= 0.0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "voting.temperature".into(),
                },
                "voting.temperature: must be positive, using the default",
            ));
        }
        if gate.improvement_ratio < 1.0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "abstention.improvement_ratio".into(),
                },
                "abstention.improvement_ratio: below 1.0 accepts worse re-queries",
            ));
        }
        issues
    }
}
