//! OpenAI-compatible chat completions adapter
//!
//! Serves OpenAI itself plus the Gemini and xAI endpoints that accept the
//! same request shape.

use super::{ProviderAdapter, map_status, map_transport_error, resolve_api_key};
use async_trait::async_trait;
use ensemble_application::{CompletionRequest, GatewayError};
use ensemble_domain::Vendor;
use ensemble_domain::providers::OpenAiProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiCompatibleAdapter {
    vendor: Vendor,
    config: OpenAiProviderConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleAdapter {
    pub fn new(vendor: Vendor, config: OpenAiProviderConfig, client: reqwest::Client) -> Self {
        Self {
            vendor,
            config,
            client,
        }
    }

    pub fn endpoint(&self) -> String {
        chat_completions_url(&self.config.base_url)
    }
}

/// `/v1/chat/completions` is appended unless the base URL already carries a
/// version segment (`/v1`, `/v1beta/openai`, ...).
pub fn chat_completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = base
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base);
    let versioned = path.split('/').skip(1).any(|segment| {
        let mut chars = segment.chars();
        chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit())
    });
    if versioned {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

fn build_body(request: &CompletionRequest) -> ChatRequest<'_> {
    let mut messages = Vec::with_capacity(2);
    if !request.system_prompt.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: &request.system_prompt,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.user_prompt,
    });
    ChatRequest {
        model: request.model.as_str(),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

fn extract_content(body: &str) -> Result<String, GatewayError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::InvalidResponse(format!("unparseable completion: {}", e)))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(GatewayError::InvalidResponse("empty completion".into()));
    }
    Ok(content)
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let api_key = resolve_api_key(self.config.api_key.as_deref(), &self.config.api_key_env)?;
        let url = self.endpoint();
        debug!(vendor = %self.vendor, model = %request.model, url = %url, "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status(status, &body));
        }
        extract_content(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::Model;

    #[test]
    fn test_chat_completions_url() {
        assert_eq!(
            chat_completions_url("https://api.openai.com"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.x.ai/"),
            "https://api.x.ai/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://generativelanguage.googleapis.com/v1beta/openai"),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
        assert_eq!(
            chat_completions_url("http://localhost:8080/v1"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_body_shape() {
        let request = CompletionRequest::new(Model::Gpt4oMini, "Be brief.", "What is Rust?")
            .with_max_tokens(300)
            .with_temperature(0.5);
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "What is Rust?");
    }

    #[test]
    fn test_body_without_system_prompt() {
        let request = CompletionRequest::new(Model::Gpt4oMini, "", "hi");
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Rust is a language. "}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Rust is a language.");

        let empty = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(matches!(
            extract_content(empty),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_content("<html>"),
            Err(GatewayError::InvalidResponse(_))
        ));
    }
}
