//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("No providers configured for tier '{0}'")]
    NoProviders(String),

    #[error("Tier '{tier}' has more than one provider with role '{role}'")]
    DuplicateRole { tier: String, role: String },

    #[error("Cache entry TTL must be greater than zero")]
    ZeroTtl,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DomainError {
    /// Whether this error means the request itself could not be built
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            DomainError::EmptyPrompt
                | DomainError::NoProviders(_)
                | DomainError::DuplicateRole { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DomainError::EmptyPrompt.to_string(), "Prompt cannot be empty");
        assert_eq!(
            DomainError::NoProviders("free".to_string()).to_string(),
            "No providers configured for tier 'free'"
        );
    }

    #[test]
    fn test_is_request_error() {
        assert!(DomainError::EmptyPrompt.is_request_error());
        assert!(DomainError::NoProviders("premium".into()).is_request_error());
        assert!(
            DomainError::DuplicateRole {
                tier: "free".into(),
                role: "gpt4o".into()
            }
            .is_request_error()
        );
        assert!(!DomainError::ZeroTtl.is_request_error());
    }
}
