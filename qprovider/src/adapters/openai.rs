//! OpenAI-compatible chat-completions adapter, shared by every vendor that
//! speaks that wire dialect (OpenAI, OpenRouter, Groq, Nebius).

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::adapters::{PayloadEventIterator, PayloadOutcome};
use crate::{
    BoxedEventIterator, BoxedPayloadIterator, ComposedMessage, ContentPart, CredentialManager,
    DEFAULT_MAX_TOKENS, MessageContent, ModelCatalog, ProviderAdapter, ProviderError,
    ProviderErrorKind, ProviderId, ProviderRequest, Role, StreamTransport, WireRequest,
    attach_to_messages, error_events, multimodal::encode_image,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const NEBIUS_BASE_URL: &str = "https://api.tokenfactory.nebius.com/v1";

/// Preferred name for the output size cap. Some deployments only accept the
/// older name, so a rejection of the primary triggers exactly one retry with
/// the alternate; never a second.
const PRIMARY_SIZE_PARAM: &str = "max_completion_tokens";
const FALLBACK_SIZE_PARAM: &str = "max_tokens";

#[derive(Clone)]
pub struct OpenAiCompatAdapter {
    provider: ProviderId,
    credentials: Arc<CredentialManager>,
    catalog: Arc<ModelCatalog>,
    transport: Arc<dyn StreamTransport>,
    base_url: String,
    extra_headers: Vec<(String, String)>,
}

impl OpenAiCompatAdapter {
    pub fn new(
        provider: ProviderId,
        credentials: Arc<CredentialManager>,
        catalog: Arc<ModelCatalog>,
        transport: Arc<dyn StreamTransport>,
    ) -> Self {
        Self {
            provider,
            credentials,
            catalog,
            transport,
            base_url: default_base_url(provider).to_string(),
            extra_headers: Vec::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    fn open_stream(&self, request: &ProviderRequest) -> Result<BoxedPayloadIterator, ProviderError> {
        request.validate()?;
        let api_key = self.credentials.require_api_key(self.provider)?;

        match self.open_with_size_param(request, &api_key, PRIMARY_SIZE_PARAM) {
            Ok(payloads) => Ok(payloads),
            Err(error) if rejects_size_param(&error) => {
                self.open_with_size_param(request, &api_key, FALLBACK_SIZE_PARAM)
            }
            Err(error) => Err(error),
        }
    }

    fn open_with_size_param(
        &self,
        request: &ProviderRequest,
        api_key: &str,
        size_param: &str,
    ) -> Result<BoxedPayloadIterator, ProviderError> {
        let body = self.build_body(request, size_param)?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let mut wire = WireRequest::new(url, body)
            .with_header("authorization", format!("Bearer {api_key}"));
        for (name, value) in &self.extra_headers {
            wire = wire.with_header(name.clone(), value.clone());
        }

        self.transport.open(wire)
    }

    fn build_body(
        &self,
        request: &ProviderRequest,
        size_param: &str,
    ) -> Result<Value, ProviderError> {
        let composed = attach_to_messages(&request.messages, &request.attachments)?;
        let messages = composed.into_iter().map(message_value).collect::<Vec<_>>();

        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(request.model.clone()));
        body.insert("messages".to_string(), Value::Array(messages));
        body.insert("stream".to_string(), Value::Bool(true));
        body.insert(size_param.to_string(), Value::from(DEFAULT_MAX_TOKENS));

        let qualified = format!("{}:{}", self.provider, request.model);
        if let Some(temperature) = self
            .catalog
            .resolve_temperature(&qualified, request.temperature)
        {
            body.insert("temperature".to_string(), Value::from(temperature));
        }

        Ok(Value::Object(body))
    }
}

impl ProviderAdapter for OpenAiCompatAdapter {
    fn id(&self) -> ProviderId {
        self.provider
    }

    fn stream(&self, request: ProviderRequest) -> BoxedEventIterator {
        match self.open_stream(&request) {
            Ok(payloads) => Box::new(PayloadEventIterator::new(payloads, interpret_payload)),
            Err(error) => error_events(error),
        }
    }
}

fn default_base_url(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenRouter => OPENROUTER_BASE_URL,
        ProviderId::Groq => GROQ_BASE_URL,
        ProviderId::Nebius => NEBIUS_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}

fn rejects_size_param(error: &ProviderError) -> bool {
    error.kind == ProviderErrorKind::InvalidRequest && error.message.contains(PRIMARY_SIZE_PARAM)
}

fn message_value(message: ComposedMessage) -> Value {
    let role = role_str(message.role);
    match message.content {
        MessageContent::Text(text) => json!({"role": role, "content": text}),
        MessageContent::Parts(parts) => {
            let parts = parts.into_iter().map(part_value).collect::<Vec<_>>();
            json!({"role": role, "content": parts})
        }
    }
}

fn part_value(part: ContentPart) -> Value {
    match part {
        ContentPart::Text(text) => json!({"type": "text", "text": text}),
        ContentPart::Image { mime, data } => json!({
            "type": "image_url",
            "image_url": {
                "url": format!("data:{};base64,{}", mime.as_str(), encode_image(&data)),
            },
        }),
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn interpret_payload(payload: &str) -> Result<PayloadOutcome, ProviderError> {
    if payload == "[DONE]" {
        return Ok(PayloadOutcome::Finished);
    }

    let value: Value = serde_json::from_str(payload)
        .map_err(|error| ProviderError::transport(format!("malformed stream chunk: {error}")))?;

    Ok(match extract_delta_text(&value) {
        Some(text) if !text.is_empty() => PayloadOutcome::Delta(text),
        _ => PayloadOutcome::Skip,
    })
}

/// Most specific field first: the delta's plain content string, else its
/// typed content parts, else a chunk-level text field. Chunks without
/// extractable text are skipped, never treated as malformed.
fn extract_delta_text(value: &Value) -> Option<String> {
    if let Some(delta) = value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("delta"))
    {
        if let Some(text) = delta.get("content").and_then(Value::as_str) {
            return Some(text.to_string());
        }

        if let Some(parts) = delta.get("content").and_then(Value::as_array) {
            let text: String = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    value.get("text").and_then(Value::as_str).map(str::to_string)
}
