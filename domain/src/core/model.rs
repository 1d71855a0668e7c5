//! Model value object representing a vendor model behind a provider slot

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Vendor family of a model.
///
/// Used for table lookups (reliability priors, length bands) and for routing
/// a request to the adapter that speaks the vendor's API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    OpenAi,
    Anthropic,
    Google,
    Xai,
    Other,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Anthropic => "anthropic",
            Vendor::Google => "google",
            Vendor::Xai => "xai",
            Vendor::Other => "other",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Vendor::OpenAi),
            "anthropic" => Ok(Vendor::Anthropic),
            "google" | "gemini" => Ok(Vendor::Google),
            "xai" | "grok" => Ok(Vendor::Xai),
            "other" => Ok(Vendor::Other),
            _ => Err(format!("Invalid vendor: {}", s)),
        }
    }
}

/// Available LLM models (Value Object)
///
/// Each provider slot of an ensemble tier names one model. Unknown names are
/// kept as [`Model::Custom`] and their vendor is inferred from the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    // OpenAI models
    Gpt4oMini,
    Gpt4o,
    Gpt41Mini,
    // Anthropic models
    ClaudeHaiku35,
    ClaudeSonnet4,
    // Google models
    Gemini20Flash,
    Gemini25Pro,
    // xAI models
    Grok3Mini,
    // Custom
    Custom(String),
}

impl Model {
    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Gpt4o => "gpt-4o",
            Model::Gpt41Mini => "gpt-4.1-mini",
            Model::ClaudeHaiku35 => "claude-3-5-haiku-latest",
            Model::ClaudeSonnet4 => "claude-sonnet-4-0",
            Model::Gemini20Flash => "gemini-2.0-flash",
            Model::Gemini25Pro => "gemini-2.5-pro",
            Model::Grok3Mini => "grok-3-mini",
            Model::Custom(s) => s,
        }
    }

    /// Models dispatched for the free tier
    pub fn free_tier_models() -> Vec<Model> {
        vec![Model::Gpt4oMini, Model::Gemini20Flash, Model::ClaudeHaiku35]
    }

    /// Models dispatched for the premium tier
    pub fn premium_tier_models() -> Vec<Model> {
        vec![Model::Gpt4o, Model::Gemini25Pro, Model::ClaudeSonnet4]
    }

    /// Vendor family of this model
    pub fn vendor(&self) -> Vendor {
        match self {
            Model::Gpt4oMini | Model::Gpt4o | Model::Gpt41Mini => Vendor::OpenAi,
            Model::ClaudeHaiku35 | Model::ClaudeSonnet4 => Vendor::Anthropic,
            Model::Gemini20Flash | Model::Gemini25Pro => Vendor::Google,
            Model::Grok3Mini => Vendor::Xai,
            Model::Custom(name) => {
                let name = name.to_lowercase();
                if name.starts_with("gpt") || name.starts_with("o1") || name.starts_with("o3") {
                    Vendor::OpenAi
                } else if name.starts_with("claude") {
                    Vendor::Anthropic
                } else if name.starts_with("gemini") {
                    Vendor::Google
                } else if name.starts_with("grok") {
                    Vendor::Xai
                } else {
                    Vendor::Other
                }
            }
        }
    }
}

impl Default for Model {
    /// Returns the default model (GPT-4o mini)
    fn default() -> Self {
        Model::Gpt4oMini
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "gpt-4o-mini" => Model::Gpt4oMini,
            "gpt-4o" => Model::Gpt4o,
            "gpt-4.1-mini" => Model::Gpt41Mini,
            "claude-3-5-haiku-latest" => Model::ClaudeHaiku35,
            "claude-sonnet-4-0" => Model::ClaudeSonnet4,
            "gemini-2.0-flash" => Model::Gemini20Flash,
            "gemini-2.5-pro" => Model::Gemini25Pro,
            "grok-3-mini" => Model::Grok3Mini,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let Ok(model) = s.parse::<Model>();
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_roundtrip() {
        for model in Model::free_tier_models()
            .into_iter()
            .chain(Model::premium_tier_models())
        {
            let s = model.to_string();
            let parsed: Model = s.parse().unwrap();
            assert_eq!(model, parsed);
        }
    }

    #[test]
    fn test_custom_model() {
        let model: Model = "mistral-large".parse().unwrap();
        assert_eq!(model, Model::Custom("mistral-large".to_string()));
        assert_eq!(model.vendor(), Vendor::Other);
    }

    #[test]
    fn test_custom_model_vendor_inference() {
        let model: Model = "claude-opus-4-1".parse().unwrap();
        assert_eq!(model.vendor(), Vendor::Anthropic);
        let model: Model = "gpt-5".parse().unwrap();
        assert_eq!(model.vendor(), Vendor::OpenAi);
    }

    #[test]
    fn test_vendor_from_str() {
        assert_eq!("Gemini".parse::<Vendor>().unwrap(), Vendor::Google);
        assert!("bogus".parse::<Vendor>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Model::Gpt4o).unwrap();
        assert_eq!(json, "\"gpt-4o\"");
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Model::Gpt4o);
    }
}
