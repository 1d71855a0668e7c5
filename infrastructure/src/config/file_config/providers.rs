//! Provider configuration from TOML (`[providers]` section)

use ensemble_domain::providers::{AnthropicProviderConfig, OpenAiProviderConfig};
use ensemble_domain::{ConfigIssue, ConfigIssueCode, ProviderConfig, Vendor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Anthropic API provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnthropicConfig {
    /// Environment variable name for the API key (default: "ANTHROPIC_API_KEY").
    pub api_key_env: String,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    pub base_url: String,
    /// Anthropic API version header.
    pub api_version: String,
}

impl Default for FileAnthropicConfig {
    fn default() -> Self {
        let d = AnthropicProviderConfig::default();
        Self {
            api_key_env: d.api_key_env,
            api_key: d.api_key,
            base_url: d.base_url,
            api_version: d.api_version,
        }
    }
}

/// OpenAI-compatible endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOpenAiConfig {
    pub api_key_env: String,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl From<OpenAiProviderConfig> for FileOpenAiConfig {
    fn from(c: OpenAiProviderConfig) -> Self {
        Self {
            api_key_env: c.api_key_env,
            api_key: c.api_key,
            base_url: c.base_url,
        }
    }
}

impl From<&FileOpenAiConfig> for OpenAiProviderConfig {
    fn from(c: &FileOpenAiConfig) -> Self {
        Self {
            api_key_env: c.api_key_env.clone(),
            api_key: c.api_key.clone(),
            base_url: c.base_url.clone(),
        }
    }
}

fn default_openai() -> FileOpenAiConfig {
    OpenAiProviderConfig::openai().into()
}

fn default_google() -> FileOpenAiConfig {
    OpenAiProviderConfig::google().into()
}

fn default_xai() -> FileOpenAiConfig {
    OpenAiProviderConfig::xai().into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProvidersConfig {
    #[serde(default)]
    pub anthropic: FileAnthropicConfig,
    #[serde(default = "default_openai")]
    pub openai: FileOpenAiConfig,
    #[serde(default = "default_google")]
    pub google: FileOpenAiConfig,
    #[serde(default = "default_xai")]
    pub xai: FileOpenAiConfig,
    /// Explicit model → vendor routing overrides.
    #[serde(default)]
    pub routing: HashMap<String, String>,
}

impl Default for FileProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: FileAnthropicConfig::default(),
            openai: default_openai(),
            google: default_google(),
            xai: default_xai(),
            routing: HashMap::new(),
        }
    }
}

impl FileProvidersConfig {
    /// Convert to the provider-neutral domain type. Routing entries with an
    /// unknown vendor are dropped with a warning.
    pub fn to_provider_config(&self) -> (ProviderConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut routing = HashMap::new();
        for (model, vendor) in &self.routing {
            match vendor.parse::<Vendor>() {
                Ok(v) => {
                    routing.insert(model.clone(), v);
                }
                Err(_) => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: format!("providers.routing.{}", model),
                        value: vendor.clone(),
                        valid_values: ["openai", "anthropic", "google", "xai", "other"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    },
                    format!(
                        "providers.routing.{}: unknown vendor '{}', route ignored",
                        model, vendor
                    ),
                )),
            }
        }

        let config = ProviderConfig {
            routing,
            anthropic: AnthropicProviderConfig {
                api_key_env: self.anthropic.api_key_env.clone(),
                api_key: self.anthropic.api_key.clone(),
                base_url: self.anthropic.base_url.clone(),
                api_version: self.anthropic.api_version.clone(),
            },
            openai: (&self.openai).into(),
            google: (&self.google).into(),
            xai: (&self.xai).into(),
        };
        (config, issues)
    }
}
