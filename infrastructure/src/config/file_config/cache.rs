//! Response cache configuration from TOML (`[cache]` section)
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_secs = 3600
//! scope = "tier"              # "tier" | "user"
//! similarity_threshold = 0.85
//! directory = "~/.cache/ensemble"
//! warm_prompts = ["What is Rust?"]
//! ```

use ensemble_application::CacheSettings;
use ensemble_domain::{CacheScope, ConfigIssue, ConfigIssueCode, Tier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    /// "tier" or "user"
    pub scope: String,
    pub similarity_threshold: f64,
    /// On-disk tier location. Unset means memory only.
    pub directory: Option<PathBuf>,
    /// Entries kept by the in-memory tier
    pub memory_capacity: usize,
    /// Payloads at least this large are gzip-compressed on disk
    pub compress_min_bytes: usize,
    pub warm_prompts: Vec<String>,
    pub warm_interval_secs: u64,
    pub warm_tier: String,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        let settings = CacheSettings::default();
        Self {
            enabled: settings.enabled,
            ttl_secs: settings.ttl.as_secs(),
            scope: "tier".to_string(),
            similarity_threshold: settings.similarity_threshold,
            directory: None,
            memory_capacity: 1_000,
            compress_min_bytes: 1_024,
            warm_prompts: Vec::new(),
            warm_interval_secs: settings.warm_interval.as_secs(),
            warm_tier: settings.warm_tier.to_string(),
        }
    }
}

impl FileCacheConfig {
    pub fn parse_scope(&self) -> (Option<CacheScope>, Vec<ConfigIssue>) {
        match self.scope.to_lowercase().as_str() {
            "tier" => (Some(CacheScope::Tier), vec![]),
            "user" => (Some(CacheScope::User), vec![]),
            _ => (
                None,
                vec![ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "cache.scope".into(),
                        value: self.scope.clone(),
                        valid_values: vec!["tier".into(), "user".into()],
                    },
                    format!(
                        "cache.scope: invalid value '{}', using default 'tier'",
                        self.scope
                    ),
                )],
            ),
        }
    }

    pub fn parse_warm_tier(&self) -> (Option<Tier>, Vec<ConfigIssue>) {
        match self.warm_tier.parse::<Tier>() {
            Ok(tier) => (Some(tier), vec![]),
            Err(_) => (
                None,
                vec![ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "cache.warm_tier".into(),
                        value: self.warm_tier.clone(),
                        valid_values: vec!["free".into(), "premium".into()],
                    },
                    format!(
                        "cache.warm_tier: invalid value '{}', using default 'free'",
                        self.warm_tier
                    ),
                )],
            ),
        }
    }

    /// Resolve into application settings, collecting issues.
    pub fn to_settings(&self) -> (CacheSettings, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut settings = CacheSettings {
            enabled: self.enabled,
            warm_prompts: self
                .warm_prompts
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect(),
            ..CacheSettings::default()
        };

        let (scope, scope_issues) = self.parse_scope();
        issues.extend(scope_issues);
        if let Some(scope) = scope {
            settings.scope = scope;
        }

        let (warm_tier, tier_issues) = self.parse_warm_tier();
        issues.extend(tier_issues);
        if let Some(tier) = warm_tier {
            settings.warm_tier = tier;
        }

        if self.ttl_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "cache.ttl_secs".into(),
                },
                "cache.ttl_secs: must be positive, using the default",
            ));
        } else {
            settings.ttl = Duration::from_secs(self.ttl_secs);
        }

        if self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0 {
            settings.similarity_threshold = self.similarity_threshold;
        } else {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "cache.similarity_threshold".into(),
                },
                format!(
                    "cache.similarity_threshold: {} is outside (0, 1], using the default",
                    self.similarity_threshold
                ),
            ));
        }

        if self.warm_interval_secs > 0 {
            settings.warm_interval = Duration::from_secs(self.warm_interval_secs);
        } else {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "cache.warm_interval_secs".into(),
                },
                "cache.warm_interval_secs: must be positive, using the default",
            ));
        }

        if !settings.enabled && !settings.warm_prompts.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::DeadSection {
                    section: "cache.warm_prompts".into(),
                },
                "cache.warm_prompts: ignored because the cache is disabled",
            ));
        }
        if settings.scope == CacheScope::User && !settings.warm_prompts.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::DeadSection {
                    section: "cache.warm_prompts".into(),
                },
                "cache.warm_prompts: ignored because the cache is scoped per user",
            ));
        }

        (settings, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_application() {
        let (settings, issues) = FileCacheConfig::default().to_settings();
        assert!(issues.is_empty());
        assert_eq!(settings, CacheSettings::default());
    }

    #[test]
    fn test_invalid_scope_falls_back() {
        let config = FileCacheConfig {
            scope: "global".into(),
            ..FileCacheConfig::default()
        };
        let (settings, issues) = config.to_settings();
        assert_eq!(settings.scope, CacheScope::Tier);
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0].code,
            ConfigIssueCode::InvalidEnumValue { field, .. } if field == "cache.scope"
        ));
    }

    #[test]
    fn test_warm_prompts_on_user_scope_are_dead() {
        let config = FileCacheConfig {
            scope: "user".into(),
            warm_prompts: vec!["What is Rust?".into(), "  ".into()],
            ..FileCacheConfig::default()
        };
        let (settings, issues) = config.to_settings();
        assert_eq!(settings.warm_prompts, vec!["What is Rust?".to_string()]);
        assert!(issues.iter().any(|i| matches!(
            &i.code,
            ConfigIssueCode::DeadSection { section } if section == "cache.warm_prompts"
        )));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let config = FileCacheConfig {
            similarity_threshold: 1.5,
            ttl_secs: 0,
            ..FileCacheConfig::default()
        };
        let (settings, issues) = config.to_settings();
        assert_eq!(settings.similarity_threshold, 0.85);
        assert_eq!(settings.ttl, Duration::from_secs(3600));
        assert_eq!(issues.len(), 2);
    }
}
