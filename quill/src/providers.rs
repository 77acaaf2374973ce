//! Stable adapter construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use qprovider::adapters::{AnthropicAdapter, GeminiAdapter, OpenAiCompatAdapter};
use qprovider::{
    AdapterRegistry, CredentialManager, HttpStreamTransport, ModelCatalog, ProviderError,
    ProviderId, StreamTransport,
};

#[derive(Debug, Clone)]
pub struct AdapterBuildConfig {
    pub timeout: Duration,
}

impl Default for AdapterBuildConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
        }
    }
}

impl AdapterBuildConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Registers one adapter per served vendor: the OpenAI-compatible family on
/// their respective base URLs, plus Anthropic and Gemini on their native
/// protocols. All share one HTTP transport.
pub fn build_adapter_registry(
    credentials: Arc<CredentialManager>,
    catalog: Arc<ModelCatalog>,
) -> Result<AdapterRegistry, ProviderError> {
    build_adapter_registry_with(credentials, catalog, AdapterBuildConfig::default())
}

pub fn build_adapter_registry_with(
    credentials: Arc<CredentialManager>,
    catalog: Arc<ModelCatalog>,
    config: AdapterBuildConfig,
) -> Result<AdapterRegistry, ProviderError> {
    let transport: Arc<dyn StreamTransport> =
        Arc::new(HttpStreamTransport::with_timeout(config.timeout)?);

    let mut registry = AdapterRegistry::new();

    for provider in [
        ProviderId::OpenAi,
        ProviderId::OpenRouter,
        ProviderId::Groq,
        ProviderId::Nebius,
    ] {
        let mut adapter = OpenAiCompatAdapter::new(
            provider,
            credentials.clone(),
            catalog.clone(),
            transport.clone(),
        );

        if provider == ProviderId::OpenRouter {
            for (name, value) in openrouter_attribution_headers() {
                adapter = adapter.with_extra_header(name, value);
            }
        }

        registry.register(adapter);
    }

    registry.register(AnthropicAdapter::new(
        credentials.clone(),
        catalog.clone(),
        transport.clone(),
    ));
    registry.register(GeminiAdapter::new(credentials, catalog, transport));

    Ok(registry)
}

/// Optional but recommended by OpenRouter for attribution.
pub fn openrouter_attribution_headers() -> Vec<(String, String)> {
    let mut headers = Vec::new();
    if let Ok(referer) = std::env::var("OPENROUTER_HTTP_REFERER")
        && !referer.trim().is_empty()
    {
        headers.push(("HTTP-Referer".to_string(), referer));
    }
    if let Ok(title) = std::env::var("OPENROUTER_X_TITLE")
        && !title.trim().is_empty()
    {
        headers.push(("X-Title".to_string(), title));
    }
    headers
}
