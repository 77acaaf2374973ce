//! Vendor-agnostic request, message, and attachment model types.
//!
//! ```rust
//! use qprovider::{Message, ProviderErrorKind, ProviderModel, ProviderRequest, Role};
//!
//! let parsed = ProviderModel::parse("openai:gpt-5-mini").expect("valid model");
//! assert_eq!(parsed.qualified(), "openai:gpt-5-mini");
//!
//! let err = ProviderModel::parse("gpt-5-mini").err().expect("missing vendor should fail");
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//!
//! let request = ProviderRequest::new(
//!     "gpt-5-mini",
//!     vec![Message::new(Role::User, "Summarize this diff")],
//! );
//! assert!(request.validate().is_ok());
//! ```

use std::fmt::{Display, Formatter};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    OpenRouter,
    Groq,
    Nebius,
    Anthropic,
    Gemini,
}

impl ProviderId {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "openai" => Some(Self::OpenAi),
            "openrouter" => Some(Self::OpenRouter),
            "groq" => Some(Self::Groq),
            "nebius" => Some(Self::Nebius),
            "anthropic" => Some(Self::Anthropic),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Groq => "groq",
            Self::Nebius => "nebius",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        };

        f.write_str(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A non-text artifact associated with a chat turn: an image or a chunk of
/// extracted document text, addressed by its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    pub fn from_base64(mime: impl Into<String>, encoded: &str) -> Result<Self, ProviderError> {
        let data = BASE64.decode(encoded.trim()).map_err(|error| {
            ProviderError::invalid_request(format!("attachment is not valid base64: {error}"))
        })?;
        Ok(Self::new(mime, data))
    }
}

/// A `"vendor:model_name"` pair as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderModel {
    pub provider: ProviderId,
    pub model_name: String,
}

impl ProviderModel {
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        let Some((provider, model_name)) = value.split_once(':') else {
            return Err(ProviderError::invalid_request(
                "Model must be like 'provider:model_name'",
            ));
        };

        let provider = provider.trim().to_lowercase();
        let model_name = model_name.trim();
        if provider.is_empty() || model_name.is_empty() {
            return Err(ProviderError::invalid_request(
                "Model must be like 'provider:model_name'",
            ));
        }

        let provider = ProviderId::parse(&provider).ok_or_else(|| {
            ProviderError::invalid_request(format!("Unknown provider: {provider}"))
        })?;

        Ok(Self {
            provider,
            model_name: model_name.to_string(),
        })
    }

    pub fn qualified(&self) -> String {
        format!("{}:{}", self.provider, self.model_name)
    }
}

/// Normalized request handed to a provider adapter. Built fresh per call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub attachments: Vec<Attachment>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::invalid_request("model must not be empty"));
        }

        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request(
                "at least one message is required",
            ));
        }

        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                "temperature must be in the inclusive range 0.0..=2.0",
                false,
            ));
        }

        Ok(())
    }
}
