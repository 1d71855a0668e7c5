//! Tier configuration from TOML (`[tiers.free]` / `[tiers.premium]`)
//!
//! Every field is optional and overrides the built-in tier.
//!
//! ```toml
//! [tiers.free]
//! provider_timeout_secs = 10
//! synthesizer = "gpt-4o-mini"
//! providers = [
//!     { role = "gpt4o", model = "gpt-4o-mini" },
//!     { role = "claude", model = "claude-3-5-haiku-latest" },
//! ]
//! ```

use ensemble_domain::{ConfigIssue, ConfigIssueCode, Model, ProviderSlot, Tier, TierConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSlotConfig {
    pub role: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTierConfig {
    pub providers: Option<Vec<FileSlotConfig>>,
    pub provider_timeout_secs: Option<f64>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub synthesizer: Option<String>,
    pub synthesis_max_tokens: Option<u32>,
    pub synthesis_temperature: Option<f32>,
    pub memory_max_tokens: Option<u32>,
}

impl FileTierConfig {
    /// Apply the overrides to the built-in tier, collecting issues.
    pub fn to_tier_config(&self, tier: Tier) -> (TierConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut config = TierConfig::for_tier(tier);
        let prefix = format!("tiers.{}", tier);

        if let Some(providers) = &self.providers {
            let mut slots = Vec::new();
            for (i, slot) in providers.iter().enumerate() {
                if slot.role.trim().is_empty() || slot.model.trim().is_empty() {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::OutOfRange {
                            field: format!("{}.providers[{}]", prefix, i),
                        },
                        format!("{}.providers[{}]: role and model cannot be empty", prefix, i),
                    ));
                    continue;
                }
                let role = slot.role.trim();
                if slots.iter().any(|s: &ProviderSlot| s.role == role) {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::DuplicateRole {
                            tier: tier.to_string(),
                            role: role.to_string(),
                        },
                        format!("{}.providers[{}]: role '{}' is already used", prefix, i, role),
                    ));
                    continue;
                }
                let Ok(model) = slot.model.parse::<Model>();
                slots.push(ProviderSlot::new(role, model));
            }
            config.slots = slots;
        }
        if config.slots.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyTier {
                    tier: tier.to_string(),
                },
                format!("{}: no providers configured", prefix),
            ));
        }

        if let Some(secs) = self.provider_timeout_secs {
            if secs.is_finite() && secs > 0.0 {
                config.provider_timeout = Duration::from_secs_f64(secs);
            } else {
                issues.push(out_of_range(
                    &prefix,
                    "provider_timeout_secs",
                    "must be positive",
                ));
            }
        }
        if let Some(t) = self.temperature {
            if (0.0..=2.0).contains(&t) {
                config.temperature = t;
            } else {
                issues.push(out_of_range(&prefix, "temperature", "must be within 0..=2"));
            }
        }
        if let Some(t) = self.synthesis_temperature {
            if (0.0..=2.0).contains(&t) {
                config.synthesis_temperature = t;
            } else {
                issues.push(out_of_range(
                    &prefix,
                    "synthesis_temperature",
                    "must be within 0..=2",
                ));
            }
        }
        if let Some(tokens) = self.max_tokens {
            config.max_tokens = tokens.max(1);
        }
        if let Some(tokens) = self.synthesis_max_tokens {
            config.synthesis_max_tokens = tokens.max(1);
        }
        if let Some(tokens) = self.memory_max_tokens {
            config.memory_max_tokens = tokens;
        }
        if let Some(name) = &self.synthesizer {
            if name.trim().is_empty() {
                issues.push(out_of_range(&prefix, "synthesizer", "cannot be empty"));
            } else {
                let Ok(model) = name.parse::<Model>();
                config.synthesizer = model;
            }
        }

        (config, issues)
    }
}

fn out_of_range(prefix: &str, field: &str, reason: &str) -> ConfigIssue {
    ConfigIssue::warning(
        ConfigIssueCode::OutOfRange {
            field: format!("{}.{}", prefix, field),
        },
        format!("{}.{}: {}, using the default", prefix, field, reason),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTiersConfig {
    pub free: FileTierConfig,
    pub premium: FileTierConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overrides_keep_builtin() {
        let (config, issues) = FileTierConfig::default().to_tier_config(Tier::Premium);
        assert!(issues.is_empty());
        assert_eq!(config, TierConfig::premium());
    }

    #[test]
    fn test_overrides_apply() {
        let file: FileTierConfig = toml::from_str(
            r#"
provider_timeout_secs = 2.5
temperature = 0.4
synthesizer = "claude-sonnet-4-0"
providers = [{ role = "solo", model = "grok-3-mini" }]
"#,
        )
        .unwrap();
        let (config, issues) = file.to_tier_config(Tier::Free);
        assert!(issues.is_empty());
        assert_eq!(config.provider_timeout, Duration::from_millis(2500));
        assert_eq!(config.temperature, 0.4);
        assert_eq!(config.synthesizer, Model::ClaudeSonnet4);
        assert_eq!(config.slots, vec![ProviderSlot::new("solo", Model::Grok3Mini)]);
    }

    #[test]
    fn test_empty_provider_list_is_error() {
        let file = FileTierConfig {
            providers: Some(vec![]),
            ..FileTierConfig::default()
        };
        let (_, issues) = file.to_tier_config(Tier::Free);
        assert!(issues.iter().any(|i| i.is_error()
            && i.code
                == ConfigIssueCode::EmptyTier {
                    tier: "free".into()
                }));
    }

    #[test]
    fn test_duplicate_role_is_error() {
        let file = FileTierConfig {
            providers: Some(vec![
                FileSlotConfig {
                    role: "gpt4o".into(),
                    model: "gpt-4o-mini".into(),
                },
                FileSlotConfig {
                    role: " gpt4o ".into(),
                    model: "gpt-4o".into(),
                },
            ]),
            ..FileTierConfig::default()
        };
        let (config, issues) = file.to_tier_config(Tier::Premium);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(
            issues[0].code,
            ConfigIssueCode::DuplicateRole {
                tier: "premium".into(),
                role: "gpt4o".into()
            }
        );
        assert_eq!(config.slots.len(), 1);
        assert_eq!(config.duplicate_role(), None);
    }

    #[test]
    fn test_bad_values_fall_back_with_warnings() {
        let file = FileTierConfig {
            provider_timeout_secs: Some(0.0),
            temperature: Some(5.0),
            ..FileTierConfig::default()
        };
        let (config, issues) = file.to_tier_config(Tier::Free);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| !i.is_error()));
        assert_eq!(config.provider_timeout, TierConfig::free().provider_timeout);
    }
}
