//! Prompt value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// A user prompt to be answered by the ensemble (Value Object)
///
/// Guaranteed non-blank. Construction is the only point where a request can
/// be rejected outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    content: String,
}

impl Prompt {
    /// Try to create a new prompt
    pub fn new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::EmptyPrompt);
        }
        Ok(Self { content })
    }

    /// Get the prompt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Normalized form used for cache keys: lowercase, collapsed whitespace,
    /// trailing punctuation removed.
    pub fn normalized(&self) -> String {
        normalize_prompt(&self.content)
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// Normalize free text the same way [`Prompt::normalized`] does.
pub fn normalize_prompt(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prompt_rejected() {
        assert_eq!(Prompt::new("   \n"), Err(DomainError::EmptyPrompt));
    }

    #[test]
    fn test_normalized() {
        let prompt = Prompt::new("  What is   Rust?? ").unwrap();
        assert_eq!(prompt.normalized(), "what is rust");
    }

    #[test]
    fn test_normalized_equal_for_variants() {
        let a = Prompt::new("Explain TCP handshakes.").unwrap();
        let b = Prompt::new("explain   tcp handshakes").unwrap();
        assert_eq!(a.normalized(), b.normalized());
    }
}
