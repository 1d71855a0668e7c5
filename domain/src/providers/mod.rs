//! Provider configuration types (provider-neutral, serde-free).
//!
//! These types define the shape of provider settings without depending
//! on any serialization format (TOML, JSON, etc.).

use crate::core::model::{Model, Vendor};
use std::collections::HashMap;

/// Top-level provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Explicit model → vendor routing overrides.
    pub routing: HashMap<String, Vendor>,
    /// Anthropic messages API settings.
    pub anthropic: AnthropicProviderConfig,
    /// OpenAI chat-completions settings.
    pub openai: OpenAiProviderConfig,
    /// Gemini through its OpenAI-compatible endpoint.
    pub google: OpenAiProviderConfig,
    /// xAI through its OpenAI-compatible endpoint.
    pub xai: OpenAiProviderConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            routing: HashMap::new(),
            anthropic: AnthropicProviderConfig::default(),
            openai: OpenAiProviderConfig::openai(),
            google: OpenAiProviderConfig::google(),
            xai: OpenAiProviderConfig::xai(),
        }
    }
}

impl ProviderConfig {
    /// Vendor a model is sent to: explicit routing first, then the model's
    /// own vendor.
    pub fn vendor_for(&self, model: &Model) -> Vendor {
        self.routing
            .get(model.as_str())
            .copied()
            .unwrap_or_else(|| model.vendor())
    }
}

/// Anthropic API provider configuration.
#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    /// Environment variable name for the API key (default: "ANTHROPIC_API_KEY").
    pub api_key_env: String,
    /// Direct API key (prefer the environment variable).
    pub api_key: Option<String>,
    /// Base URL for the Anthropic API.
    pub base_url: String,
    /// Anthropic API version header.
    pub api_version: String,
}

impl Default for AnthropicProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            api_version: "2023-06-01".to_string(),
        }
    }
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    /// Environment variable name for the API key.
    pub api_key_env: String,
    /// Direct API key (prefer the environment variable).
    pub api_key: Option<String>,
    /// Base URL; `/v1/chat/completions` is appended unless the URL already
    /// ends with a version segment.
    pub base_url: String,
}

impl Default for OpenAiProviderConfig {
    fn default() -> Self {
        Self::openai()
    }
}

impl OpenAiProviderConfig {
    pub fn openai() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
        }
    }

    pub fn google() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
        }
    }

    pub fn xai() -> Self {
        Self {
            api_key_env: "XAI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://api.x.ai".to_string(),
        }
    }
}
