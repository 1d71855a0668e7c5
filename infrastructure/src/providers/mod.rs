//! HTTP provider adapters
//!
//! Each adapter speaks one wire protocol. [`RoutingGateway`] picks the
//! adapter for a model through [`ProviderConfig::vendor_for`] and is the
//! [`LlmGateway`](ensemble_application::LlmGateway) the pipeline sees.

pub mod anthropic;
pub mod openai;
pub mod routing;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiCompatibleAdapter;
pub use routing::RoutingGateway;

use async_trait::async_trait;
use ensemble_application::{CompletionRequest, GatewayError};
use ensemble_domain::Vendor;
use reqwest::StatusCode;

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn vendor(&self) -> Vendor;
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}

/// Resolve an API key: the inline value wins, then the environment variable.
pub(crate) fn resolve_api_key(inline: Option<&str>, env_var: &str) -> Result<String, GatewayError> {
    if let Some(key) = inline.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var(env_var)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| GatewayError::MissingCredentials(format!("{} is not set", env_var)))
}

pub(crate) fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_connect() {
        GatewayError::ConnectionError(err.to_string())
    } else if err.is_decode() {
        GatewayError::InvalidResponse(err.to_string())
    } else {
        GatewayError::RequestFailed(err.to_string())
    }
}

/// Map a non-success status and its body to a gateway error.
pub(crate) fn map_status(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(String::from))
        })
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::MissingCredentials(format!("authentication failed ({}): {}", status, message))
        }
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited(message),
        StatusCode::NOT_FOUND => GatewayError::ModelNotAvailable(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::Timeout,
        status => GatewayError::RequestFailed(format!("{}: {}", status, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_key_wins() {
        let key = resolve_api_key(Some(" sk-inline "), "ENSEMBLE_TEST_UNSET_KEY_VAR").unwrap();
        assert_eq!(key, "sk-inline");
    }

    #[test]
    fn test_missing_key() {
        let err = resolve_api_key(None, "ENSEMBLE_TEST_UNSET_KEY_VAR").unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials(_)));
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"error": {"message": "slow down", "type": "rate_limit"}}"#;
        assert_eq!(
            map_status(StatusCode::TOO_MANY_REQUESTS, body),
            GatewayError::RateLimited("slow down".into())
        );
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "nope"),
            GatewayError::MissingCredentials(_)
        ));
        assert_eq!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": "boom"}"#),
            GatewayError::RequestFailed("500 Internal Server Error: boom".into())
        );
    }
}
