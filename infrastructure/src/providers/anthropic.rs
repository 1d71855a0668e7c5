//! Anthropic messages API adapter

use super::{ProviderAdapter, map_status, map_transport_error, resolve_api_key};
use async_trait::async_trait;
use ensemble_application::{CompletionRequest, GatewayError};
use ensemble_domain::Vendor;
use ensemble_domain::providers::AnthropicProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicAdapter {
    config: AnthropicProviderConfig,
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(config: AnthropicProviderConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

fn build_body(request: &CompletionRequest) -> MessagesRequest<'_> {
    MessagesRequest {
        model: request.model.as_str(),
        max_tokens: request.max_tokens,
        // the messages API caps temperature at 1.0
        temperature: request.temperature.clamp(0.0, 1.0),
        system: &request.system_prompt,
        messages: [Message {
            role: "user",
            content: &request.user_prompt,
        }],
    }
}

fn extract_text(body: &str) -> Result<String, GatewayError> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::InvalidResponse(format!("unparseable message: {}", e)))?;
    let text = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        return Err(GatewayError::InvalidResponse("no text content".into()));
    }
    Ok(text.to_string())
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let api_key = resolve_api_key(self.config.api_key.as_deref(), &self.config.api_key_env)?;
        debug!(model = %request.model, "Sending Anthropic message");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&build_body(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status(status, &body));
        }
        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::Model;

    #[test]
    fn test_endpoint() {
        let adapter = AnthropicAdapter::new(
            AnthropicProviderConfig {
                base_url: "https://api.anthropic.com/".into(),
                ..AnthropicProviderConfig::default()
            },
            reqwest::Client::new(),
        );
        assert_eq!(adapter.endpoint(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_body_shape() {
        let request = CompletionRequest::new(Model::ClaudeHaiku35, "Be brief.", "Why is the sky blue?")
            .with_temperature(1.4);
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(json["model"], "claude-3-5-haiku-latest");
        assert_eq!(json["system"], "Be brief.");
        assert_eq!(json["temperature"], 1.0);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_empty_system_is_omitted() {
        let request = CompletionRequest::new(Model::ClaudeHaiku35, "", "hi");
        let json = serde_json::to_value(build_body(&request)).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_extract_text_joins_text_blocks() {
        let body = r#"{"content":[{"type":"text","text":"Rayleigh"},{"type":"tool_use","id":"t"},{"type":"text","text":"scattering."}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Rayleigh\nscattering.");
        assert!(extract_text(r#"{"content":[]}"#).is_err());
    }
}
