//! Ensemble request and tier configuration.

use crate::core::error::DomainError;
use crate::core::model::Model;
use crate::core::prompt::Prompt;
use crate::prompt::PromptTemplate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service tier. Decides which provider slots are dispatched and with which
/// budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "premium" | "pro" => Ok(Tier::Premium),
            _ => Err(format!("Invalid tier: {}", s)),
        }
    }
}

/// One provider participating in an ensemble.
///
/// The `role` is the stable identifier used for weights, roles[] output and
/// vote records (e.g. "gpt4o", "gemini", "claude").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSlot {
    pub role: String,
    pub model: Model,
}

impl ProviderSlot {
    pub fn new(role: impl Into<String>, model: Model) -> Self {
        Self {
            role: role.into(),
            model,
        }
    }
}

/// Per-tier dispatch configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TierConfig {
    pub tier: Tier,
    /// Providers dispatched concurrently, in output order
    pub slots: Vec<ProviderSlot>,
    /// Hard timeout applied to each provider call individually
    pub provider_timeout: Duration,
    /// Token budget per provider response
    pub max_tokens: u32,
    pub temperature: f32,
    /// Model that composes the final answer
    pub synthesizer: Model,
    pub synthesis_max_tokens: u32,
    pub synthesis_temperature: f32,
    /// Token budget for the memory context prefix
    pub memory_max_tokens: u32,
}

impl TierConfig {
    /// Default free tier: three small models, 12s per provider.
    pub fn free() -> Self {
        Self {
            tier: Tier::Free,
            slots: vec![
                ProviderSlot::new("gpt4o", Model::Gpt4oMini),
                ProviderSlot::new("gemini", Model::Gemini20Flash),
                ProviderSlot::new("claude", Model::ClaudeHaiku35),
            ],
            provider_timeout: Duration::from_secs(12),
            max_tokens: 800,
            temperature: 0.7,
            synthesizer: Model::Gpt4oMini,
            synthesis_max_tokens: 1200,
            synthesis_temperature: 0.3,
            memory_max_tokens: 1000,
        }
    }

    /// Default premium tier: larger models and budgets.
    pub fn premium() -> Self {
        Self {
            tier: Tier::Premium,
            slots: vec![
                ProviderSlot::new("gpt4o", Model::Gpt4o),
                ProviderSlot::new("gemini", Model::Gemini25Pro),
                ProviderSlot::new("claude", Model::ClaudeSonnet4),
            ],
            provider_timeout: Duration::from_secs(15),
            max_tokens: 2000,
            temperature: 0.7,
            synthesizer: Model::Gpt4o,
            synthesis_max_tokens: 2000,
            synthesis_temperature: 0.3,
            memory_max_tokens: 2000,
        }
    }

    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self::free(),
            Tier::Premium => Self::premium(),
        }
    }

    /// First role used by more than one slot
    pub fn duplicate_role(&self) -> Option<&str> {
        self.slots
            .iter()
            .enumerate()
            .find(|(i, slot)| self.slots[..*i].iter().any(|s| s.role == slot.role))
            .map(|(_, slot)| slot.role.as_str())
    }

    pub fn with_slots(mut self, slots: Vec<ProviderSlot>) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_synthesizer(mut self, model: Model) -> Self {
        self.synthesizer = model;
        self
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self::free()
    }
}

/// A single ensemble request (request-scoped).
#[derive(Debug, Clone)]
pub struct EnsembleRequest {
    pub prompt: Prompt,
    pub user_id: String,
    pub session_id: String,
    pub tier: TierConfig,
    /// Memory context fetched for this user/session, if any
    pub memory_context: Option<String>,
    pub correlation_id: String,
}

impl EnsembleRequest {
    /// Build a request, rejecting blank prompts, tiers without providers and
    /// tiers where two slots share a role.
    pub fn new(
        prompt: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        tier: TierConfig,
        correlation_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let prompt = Prompt::new(prompt)?;
        if tier.slots.is_empty() {
            return Err(DomainError::NoProviders(tier.tier.to_string()));
        }
        if let Some(role) = tier.duplicate_role() {
            return Err(DomainError::DuplicateRole {
                tier: tier.tier.to_string(),
                role: role.to_string(),
            });
        }
        Ok(Self {
            prompt,
            user_id: user_id.into(),
            session_id: session_id.into(),
            tier,
            memory_context: None,
            correlation_id: correlation_id.into(),
        })
    }

    pub fn with_memory_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.memory_context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    /// The prompt actually sent to providers (memory context prefixed when
    /// present).
    pub fn effective_prompt(&self) -> String {
        match &self.memory_context {
            Some(context) => PromptTemplate::with_memory_context(context, self.prompt.content()),
            None => self.prompt.content().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_empty_prompt() {
        let err = EnsembleRequest::new(" ", "u", "s", TierConfig::free(), "c").unwrap_err();
        assert_eq!(err, DomainError::EmptyPrompt);
    }

    #[test]
    fn test_request_rejects_empty_tier() {
        let tier = TierConfig::free().with_slots(vec![]);
        let err = EnsembleRequest::new("hi", "u", "s", tier, "c").unwrap_err();
        assert_eq!(err, DomainError::NoProviders("free".to_string()));
    }

    #[test]
    fn test_request_rejects_duplicate_roles() {
        let tier = TierConfig::free().with_slots(vec![
            ProviderSlot::new("gpt4o", Model::Gpt4oMini),
            ProviderSlot::new("claude", Model::ClaudeHaiku35),
            ProviderSlot::new("gpt4o", Model::Gpt4o),
        ]);
        assert_eq!(tier.duplicate_role(), Some("gpt4o"));
        let err = EnsembleRequest::new("hi", "u", "s", tier, "c").unwrap_err();
        assert_eq!(
            err,
            DomainError::DuplicateRole {
                tier: "free".into(),
                role: "gpt4o".into()
            }
        );
        assert_eq!(TierConfig::premium().duplicate_role(), None);
    }

    #[test]
    fn test_effective_prompt_with_memory() {
        let req = EnsembleRequest::new("What next?", "u", "s", TierConfig::free(), "c")
            .unwrap()
            .with_memory_context("User likes Rust");
        let prompt = req.effective_prompt();
        assert!(prompt.contains("User likes Rust"));
        assert!(prompt.ends_with("What next?"));
    }

    #[test]
    fn test_blank_memory_context_ignored() {
        let req = EnsembleRequest::new("What next?", "u", "s", TierConfig::free(), "c")
            .unwrap()
            .with_memory_context("   ");
        assert!(req.memory_context.is_none());
        assert_eq!(req.effective_prompt(), "What next?");
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("Premium".parse::<Tier>().unwrap(), Tier::Premium);
        assert!("gold".parse::<Tier>().is_err());
    }
}
