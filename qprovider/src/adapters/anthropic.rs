//! Anthropic messages-stream adapter.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::adapters::{PayloadEventIterator, PayloadOutcome};
use crate::{
    BoxedEventIterator, BoxedPayloadIterator, ComposedMessage, ContentPart, CredentialManager,
    DEFAULT_MAX_TOKENS, MessageContent, ModelCatalog, ProviderAdapter, ProviderError,
    ProviderId, ProviderRequest, Role, StreamTransport, WireRequest, attach_to_messages,
    error_events, multimodal::encode_image,
};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicAdapter {
    credentials: Arc<CredentialManager>,
    catalog: Arc<ModelCatalog>,
    transport: Arc<dyn StreamTransport>,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(
        credentials: Arc<CredentialManager>,
        catalog: Arc<ModelCatalog>,
        transport: Arc<dyn StreamTransport>,
    ) -> Self {
        Self {
            credentials,
            catalog,
            transport,
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn open_stream(&self, request: &ProviderRequest) -> Result<BoxedPayloadIterator, ProviderError> {
        request.validate()?;
        let api_key = self.credentials.require_api_key(ProviderId::Anthropic)?;
        let body = self.build_body(request)?;
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));

        let wire = WireRequest::new(url, body)
            .with_header("x-api-key", api_key)
            .with_header("anthropic-version", ANTHROPIC_VERSION);

        self.transport.open(wire)
    }

    fn build_body(&self, request: &ProviderRequest) -> Result<Value, ProviderError> {
        let composed = attach_to_messages(&request.messages, &request.attachments)?;
        let (system_text, chat) = split_system_and_chat(composed);

        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(request.model.clone()));
        body.insert("max_tokens".to_string(), Value::from(DEFAULT_MAX_TOKENS));
        body.insert("stream".to_string(), Value::Bool(true));
        body.insert(
            "messages".to_string(),
            Value::Array(chat.into_iter().map(message_value).collect()),
        );

        let qualified = format!("{}:{}", ProviderId::Anthropic, request.model);
        if let Some(temperature) = self
            .catalog
            .resolve_temperature(&qualified, request.temperature)
        {
            body.insert("temperature".to_string(), Value::from(temperature));
        }

        if let Some(system_text) = system_text {
            body.insert(
                "system".to_string(),
                json!([{"type": "text", "text": system_text}]),
            );
        }

        Ok(Value::Object(body))
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn stream(&self, request: ProviderRequest) -> BoxedEventIterator {
        match self.open_stream(&request) {
            Ok(payloads) => Box::new(PayloadEventIterator::new(payloads, interpret_payload)),
            Err(error) => error_events(error),
        }
    }
}

/// System texts are pulled out of the turn list and joined into the
/// dedicated system field; only user and assistant turns remain.
fn split_system_and_chat(
    composed: Vec<ComposedMessage>,
) -> (Option<String>, Vec<ComposedMessage>) {
    let mut system_parts = Vec::new();
    let mut chat = Vec::new();

    for message in composed {
        if message.role == Role::System {
            let text = message.text_content();
            let text = text.trim();
            if !text.is_empty() {
                system_parts.push(text.to_string());
            }
        } else {
            chat.push(message);
        }
    }

    let system_text = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    (system_text, chat)
}

fn message_value(message: ComposedMessage) -> Value {
    let role = match message.role {
        Role::Assistant => "assistant",
        _ => "user",
    };

    match message.content {
        MessageContent::Text(text) => json!({"role": role, "content": text}),
        MessageContent::Parts(parts) => {
            let blocks = parts.into_iter().map(block_value).collect::<Vec<_>>();
            json!({"role": role, "content": blocks})
        }
    }
}

fn block_value(part: ContentPart) -> Value {
    match part {
        ContentPart::Text(text) => json!({"type": "text", "text": text}),
        ContentPart::Image { mime, data } => json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": mime.as_str(),
                "data": encode_image(&data),
            },
        }),
    }
}

fn interpret_payload(payload: &str) -> Result<PayloadOutcome, ProviderError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|error| ProviderError::transport(format!("malformed stream event: {error}")))?;

    match value.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => Ok(match extract_delta_text(&value) {
            Some(text) if !text.is_empty() => PayloadOutcome::Delta(text),
            _ => PayloadOutcome::Skip,
        }),
        Some("message_stop") => Ok(PayloadOutcome::Finished),
        Some("error") => Err(stream_error(&value)),
        // message_start, content_block_start/stop, message_delta, ping.
        _ => Ok(PayloadOutcome::Skip),
    }
}

fn extract_delta_text(value: &Value) -> Option<String> {
    let delta = value.get("delta")?;

    if let Some(text) = delta.get("text").and_then(Value::as_str) {
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

    value.get("text").and_then(Value::as_str).map(str::to_string)
}

fn stream_error(value: &Value) -> ProviderError {
    let error = value.get("error");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("vendor stream reported an error")
        .to_string();

    match error
        .and_then(|e| e.get("type"))
        .and_then(Value::as_str)
        .unwrap_or_default()
    {
        "rate_limit_error" => ProviderError::rate_limited(message),
        "overloaded_error" => ProviderError::unavailable(message),
        "authentication_error" => ProviderError::authentication(message),
        _ => ProviderError::transport(message),
    }
}
