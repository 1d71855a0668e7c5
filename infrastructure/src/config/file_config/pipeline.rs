//! Pipeline configuration from TOML (`[pipeline]` section)

use ensemble_application::PipelineSettings;
use ensemble_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Aggregate budget for one request, in seconds
    pub deadline_secs: f64,
    pub meta_voting: bool,
    pub meta_vote_max_tokens: u32,
    /// Memory lookup and semantic scoring bound, in seconds
    pub auxiliary_timeout_secs: f64,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self {
            deadline_secs: settings.deadline.as_secs_f64(),
            meta_voting: settings.meta_voting,
            meta_vote_max_tokens: settings.meta_vote_max_tokens,
            auxiliary_timeout_secs: settings.auxiliary_timeout.as_secs_f64(),
        }
    }
}

impl FilePipelineConfig {
    pub fn to_settings(&self) -> (PipelineSettings, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut settings = PipelineSettings {
            meta_voting: self.meta_voting,
            meta_vote_max_tokens: self.meta_vote_max_tokens.max(1),
            ..PipelineSettings::default()
        };
        if self.deadline_secs.is_finite() && self.deadline_secs > 0.0 {
            settings.deadline = Duration::from_secs_f64(self.deadline_secs);
        } else {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "pipeline.deadline_secs".into(),
                },
                "pipeline.deadline_secs: must be positive, using the default",
            ));
        }
        if self.auxiliary_timeout_secs.is_finite() && self.auxiliary_timeout_secs > 0.0 {
            settings.auxiliary_timeout = Duration::from_secs_f64(self.auxiliary_timeout_secs);
        } else {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "pipeline.auxiliary_timeout_secs".into(),
                },
                "pipeline.auxiliary_timeout_secs: must be positive, using the default",
            ));
        }
        (settings, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults_round_trip() {
        let (settings, issues) = FilePipelineConfig::default().to_settings();
        assert!(issues.is_empty());
        assert_eq!(settings, PipelineSettings::default());
    }

    #[test]
    fn test_negative_deadline_is_warning() {
        let config = FilePipelineConfig {
            deadline_secs: -1.0,
            ..FilePipelineConfig::default()
        };
        let (settings, issues) = config.to_settings();
        assert_eq!(settings.deadline, Duration::from_secs(30));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_auxiliary_timeout_from_file() {
        let config = FilePipelineConfig {
            auxiliary_timeout_secs: 0.5,
            ..FilePipelineConfig::default()
        };
        let (settings, issues) = config.to_settings();
        assert!(issues.is_empty());
        assert_eq!(settings.auxiliary_timeout, Duration::from_millis(500));

        let config = FilePipelineConfig {
            auxiliary_timeout_secs: 0.0,
            ..FilePipelineConfig::default()
        };
        let (settings, issues) = config.to_settings();
        assert_eq!(settings.auxiliary_timeout, Duration::from_secs(3));
        assert_eq!(issues.len(), 1);
    }
}
