//! Attachment composition onto the normalized message sequence.
//!
//! Attachments always ride on the most recent user-role message, never split
//! across messages. Vendors then render the composed parts in their own wire
//! shape (data URLs, source blocks, inline parts).
//!
//! ```rust
//! use qprovider::{attach_to_messages, Attachment, Message, MessageContent, Role};
//!
//! let messages = vec![Message::new(Role::User, "what is in this image?")];
//! let attachments = vec![Attachment::new("image/png", vec![1, 2, 3])];
//!
//! let composed = attach_to_messages(&messages, &attachments).expect("supported mime");
//! assert!(matches!(composed[0].content, MessageContent::Parts(_)));
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{Attachment, Message, ProviderError, Role};

/// Image MIME allow-list. Anything else is reported as unsupported rather
/// than forwarded to a vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
    Webp,
}

impl ImageMime {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image { mime: ImageMime, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ComposedMessage {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    /// The plain-text rendition of this message: its text content, or its
    /// text parts joined line by line.
    pub fn text_content(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text(text) => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Converts the last user-role message (and only it) to carry the attachment
/// parts. When no user-role message exists, a new one is appended as the
/// carrier rather than dropping attachments.
pub fn attach_to_messages(
    messages: &[Message],
    attachments: &[Attachment],
) -> Result<Vec<ComposedMessage>, ProviderError> {
    let mut composed = messages
        .iter()
        .map(|message| ComposedMessage::text(message.role, message.content.clone()))
        .collect::<Vec<_>>();

    if attachments.is_empty() {
        return Ok(composed);
    }

    let carrier = match composed.iter().rposition(|m| m.role == Role::User) {
        Some(index) => index,
        None => {
            composed.push(ComposedMessage::text(Role::User, ""));
            composed.len() - 1
        }
    };

    let mut parts = Vec::new();
    if let MessageContent::Text(text) = &composed[carrier].content
        && !text.is_empty()
    {
        parts.push(ContentPart::Text(text.clone()));
    }

    for attachment in attachments {
        parts.push(attachment_part(attachment)?);
    }

    composed[carrier].content = MessageContent::Parts(parts);
    Ok(composed)
}

fn attachment_part(attachment: &Attachment) -> Result<ContentPart, ProviderError> {
    if let Some(mime) = ImageMime::from_mime(&attachment.mime) {
        return Ok(ContentPart::Image {
            mime,
            data: attachment.data.clone(),
        });
    }

    if attachment.mime.trim().to_lowercase().starts_with("text/") {
        return Ok(ContentPart::Text(
            String::from_utf8_lossy(&attachment.data).into_owned(),
        ));
    }

    Err(ProviderError::unsupported_capability(format!(
        "unsupported attachment type '{}'",
        attachment.mime
    )))
}

/// Base64 used for every vendor image encoding.
pub fn encode_image(data: &[u8]) -> String {
    BASE64.encode(data)
}
