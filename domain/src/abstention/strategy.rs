//! Re-query strategies.

use crate::orchestration::request::TierConfig;
use serde::{Deserialize, Serialize};

/// Fixed strategy keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Conservative,
    DiversityFocused,
    HighQualityFocused,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Conservative => "conservative",
            StrategyKind::DiversityFocused => "diversity-focused",
            StrategyKind::HighQualityFocused => "high-quality-focused",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a tier is adjusted for a re-query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequeryStrategy {
    /// Roles to keep. Empty keeps every slot.
    pub roles: Vec<String>,
    /// Swap each slot to its premium-tier model
    pub premium_models: bool,
    pub timeout_factor: f64,
    pub temperature: f32,
    pub token_factor: f64,
}

impl Default for RequeryStrategy {
    fn default() -> Self {
        Self {
            roles: Vec::new(),
            premium_models: false,
            timeout_factor: 1.0,
            temperature: 0.7,
            token_factor: 1.0,
        }
    }
}

impl RequeryStrategy {
    /// Tier configuration for the re-query. A role filter that would leave no
    /// slot is ignored.
    pub fn apply(&self, tier: &TierConfig) -> TierConfig {
        let mut adjusted = tier.clone();

        if !self.roles.is_empty() {
            let kept: Vec<_> = tier
                .slots
                .iter()
                .filter(|s| self.roles.iter().any(|r| r == &s.role))
                .cloned()
                .collect();
            if !kept.is_empty() {
                adjusted.slots = kept;
            }
        }

        if self.premium_models {
            let premium = TierConfig::premium();
            for slot in &mut adjusted.slots {
                if let Some(upgrade) = premium.slots.iter().find(|p| p.role == slot.role) {
                    slot.model = upgrade.model.clone();
                }
            }
        }

        adjusted.provider_timeout = tier.provider_timeout.mul_f64(self.timeout_factor.max(0.1));
        adjusted.temperature = self.temperature;
        adjusted.max_tokens = ((tier.max_tokens as f64) * self.token_factor).round().max(1.0) as u32;
        adjusted
    }
}

/// Strategy contents per key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequeryStrategyTable {
    pub conservative: RequeryStrategy,
    pub diversity_focused: RequeryStrategy,
    pub high_quality_focused: RequeryStrategy,
}

impl Default for RequeryStrategyTable {
    fn default() -> Self {
        Self {
            conservative: RequeryStrategy {
                roles: vec!["gpt4o".to_string(), "claude".to_string()],
                premium_models: false,
                timeout_factor: 2.0,
                temperature: 0.2,
                token_factor: 0.8,
            },
            diversity_focused: RequeryStrategy {
                roles: Vec::new(),
                premium_models: false,
                timeout_factor: 1.5,
                temperature: 0.7,
                token_factor: 1.0,
            },
            high_quality_focused: RequeryStrategy {
                roles: Vec::new(),
                premium_models: true,
                timeout_factor: 1.25,
                temperature: 0.3,
                token_factor: 1.5,
            },
        }
    }
}

impl RequeryStrategyTable {
    pub fn get(&self, kind: StrategyKind) -> &RequeryStrategy {
        match kind {
            StrategyKind::Conservative => &self.conservative,
            StrategyKind::DiversityFocused => &self.diversity_focused,
            StrategyKind::HighQualityFocused => &self.high_quality_focused,
        }
    }
}
