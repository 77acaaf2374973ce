//! Turn request types and the normalized wire payload.

use qcommon::ChatId;
use qprovider::Attachment;
use serde::Deserialize;

use crate::ChatError;

/// One chat turn, addressed to a conversation and a `vendor:model` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub chat_id: ChatId,
    pub model: String,
    pub user_text: String,
    pub temperature: Option<f32>,
    pub attachments: Vec<Attachment>,
}

impl TurnRequest {
    pub fn new(
        chat_id: impl Into<ChatId>,
        model: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            model: model.into(),
            user_text: user_text.into(),
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

    /// Builds a turn from the client payload. Only the newest user-role
    /// message is trusted; any other client-supplied history is advisory
    /// and discarded — durable storage is the source of truth.
    pub fn from_payload(
        chat_id: impl Into<ChatId>,
        payload: ChatTurnPayload,
    ) -> Result<Self, ChatError> {
        let user_text = payload
            .messages
            .iter()
            .rev()
            .find(|message| message.role == "user")
            .map(|message| message.content.clone())
            .ok_or_else(|| ChatError::invalid_request("request must include a user message"))?;

        let attachments = payload
            .attachments
            .unwrap_or_default()
            .into_iter()
            .map(|attachment| Attachment::from_base64(attachment.mime, &attachment.base64))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ChatError::from)?;

        Ok(Self {
            chat_id: chat_id.into(),
            model: payload.model,
            user_text,
            temperature: payload.temperature,
            attachments,
        })
    }
}

/// The normalized request consumed by the core:
/// `{model, messages, temperature?, attachments?}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatTurnPayload {
    pub model: String,
    pub messages: Vec<PayloadMessage>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub attachments: Option<Vec<PayloadAttachment>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadAttachment {
    pub mime: String,
    pub base64: String,
}

/// How a streaming session ended, as reported to hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed,
    Disconnected,
}
