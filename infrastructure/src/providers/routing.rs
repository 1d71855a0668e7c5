use super::{AnthropicAdapter, OpenAiCompatibleAdapter, ProviderAdapter};
use async_trait::async_trait;
use ensemble_application::{CompletionRequest, GatewayError, LlmGateway};
use ensemble_domain::{Model, ProviderConfig, Vendor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Sends each completion to the adapter for the model's vendor.
///
/// Routing order:
///  1. `[providers.routing]` entry for the model name
///  2. the vendor inferred from the model name
///  3. models of an unknown vendor go to the OpenAI-compatible adapter, which
///     covers most self-hosted endpoints
pub struct RoutingGateway {
    adapters: HashMap<Vendor, Arc<dyn ProviderAdapter>>,
    config: ProviderConfig,
}

impl RoutingGateway {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>, config: ProviderConfig) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.vendor(), a)).collect(),
            config,
        }
    }

    /// One adapter per vendor, sharing a single HTTP client
    pub fn from_config(config: ProviderConfig) -> Self {
        let client = reqwest::Client::new();
        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(OpenAiCompatibleAdapter::new(
                Vendor::OpenAi,
                config.openai.clone(),
                client.clone(),
            )),
            Arc::new(OpenAiCompatibleAdapter::new(
                Vendor::Google,
                config.google.clone(),
                client.clone(),
            )),
            Arc::new(OpenAiCompatibleAdapter::new(
                Vendor::Xai,
                config.xai.clone(),
                client.clone(),
            )),
            Arc::new(AnthropicAdapter::new(config.anthropic.clone(), client)),
        ];
        Self::new(adapters, config)
    }

    fn resolve(&self, model: &Model) -> Result<&dyn ProviderAdapter, GatewayError> {
        let vendor = match self.config.vendor_for(model) {
            Vendor::Other => Vendor::OpenAi,
            vendor => vendor,
        };
        self.adapters
            .get(&vendor)
            .map(|a| a.as_ref())
            .ok_or_else(|| {
                GatewayError::ModelNotAvailable(format!("no {} adapter for {}", vendor, model))
            })
    }
}

#[async_trait]
impl LlmGateway for RoutingGateway {
    async fn invoke(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let adapter = self.resolve(&request.model)?;
        debug!(model = %request.model, vendor = %adapter.vendor(), "Routing completion");
        adapter.complete(request).await
    }
}
