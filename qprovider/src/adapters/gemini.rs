//! Gemini streamed-generation adapter.
//!
//! Gemini is the flat-prompt vendor here: the whole conversation is rendered
//! as one role-prefixed transcript and sent as a single user content, with
//! image attachments riding alongside as inline parts.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::adapters::{PayloadEventIterator, PayloadOutcome};
use crate::{
    BoxedEventIterator, BoxedPayloadIterator, ComposedMessage, ContentPart, CredentialManager,
    DEFAULT_MAX_TOKENS, MessageContent, ModelCatalog, ProviderAdapter, ProviderError,
    ProviderId, ProviderRequest, Role, StreamTransport, WireRequest, attach_to_messages,
    error_events, multimodal::encode_image,
};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiAdapter {
    credentials: Arc<CredentialManager>,
    catalog: Arc<ModelCatalog>,
    transport: Arc<dyn StreamTransport>,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(
        credentials: Arc<CredentialManager>,
        catalog: Arc<ModelCatalog>,
        transport: Arc<dyn StreamTransport>,
    ) -> Self {
        Self {
            credentials,
            catalog,
            transport,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn open_stream(&self, request: &ProviderRequest) -> Result<BoxedPayloadIterator, ProviderError> {
        request.validate()?;
        let api_key = self.credentials.require_api_key(ProviderId::Gemini)?;
        let body = self.build_body(request)?;

        let model_path = if request.model.starts_with("models/") {
            request.model.clone()
        } else {
            format!("models/{}", request.model)
        };
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            model_path
        );

        let wire = WireRequest::new(url, body).with_header("x-goog-api-key", api_key);
        self.transport.open(wire)
    }

    fn build_body(&self, request: &ProviderRequest) -> Result<Value, ProviderError> {
        let composed = attach_to_messages(&request.messages, &request.attachments)?;
        let prompt = build_flat_prompt(&composed);

        let mut parts = vec![json!({"text": prompt})];
        for message in &composed {
            if let MessageContent::Parts(message_parts) = &message.content {
                for part in message_parts {
                    if let ContentPart::Image { mime, data } = part {
                        parts.push(json!({
                            "inline_data": {
                                "mime_type": mime.as_str(),
                                "data": encode_image(data),
                            },
                        }));
                    }
                }
            }
        }

        let mut generation_config = Map::new();
        generation_config.insert("maxOutputTokens".to_string(), Value::from(DEFAULT_MAX_TOKENS));

        let qualified = format!("{}:{}", ProviderId::Gemini, request.model);
        if let Some(temperature) = self
            .catalog
            .resolve_temperature(&qualified, request.temperature)
        {
            generation_config.insert("temperature".to_string(), Value::from(temperature));
        }

        Ok(json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": Value::Object(generation_config),
        }))
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn stream(&self, request: ProviderRequest) -> BoxedEventIterator {
        match self.open_stream(&request) {
            Ok(payloads) => Box::new(PayloadEventIterator::new(payloads, interpret_payload)),
            Err(error) => error_events(error),
        }
    }
}

/// Renders the conversation as `System:`/`User:`/`Assistant:` lines with a
/// trailing `Assistant:` cue, skipping empty turns.
fn build_flat_prompt(composed: &[ComposedMessage]) -> String {
    let mut lines = Vec::new();

    for message in composed {
        let label = match message.role {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        };

        let text = message.text_content();
        let text = text.trim();
        if !text.is_empty() {
            lines.push(format!("{label}: {text}"));
        }
    }

    lines.push("Assistant:".to_string());
    lines.join("\n").trim().to_string()
}

fn interpret_payload(payload: &str) -> Result<PayloadOutcome, ProviderError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|error| ProviderError::transport(format!("malformed stream chunk: {error}")))?;

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("vendor stream reported an error");
        return Err(ProviderError::transport(message.to_string()));
    }

    Ok(match extract_chunk_text(&value) {
        Some(text) if !text.is_empty() => PayloadOutcome::Delta(text),
        _ => PayloadOutcome::Skip,
    })
}

/// Candidate content parts first, then the chunk-level text field. The
/// stream has no explicit done marker; exhaustion is the clean end.
fn extract_chunk_text(value: &Value) -> Option<String> {
    if let Some(parts) = value
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
    {
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
