//! Conversational streaming orchestration over vendor adapters.
//!
//! The serving loop stays cooperative: blocking vendor calls live behind the
//! bridge, partial output is persisted through the debounced buffer, and the
//! encoder guarantees the wire contract of any session — deltas, at most one
//! error, exactly one final done.

mod bridge;
mod buffer;
pub mod encoder;
mod error;
mod hooks;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatService, ChatTurnPayload, ConversationStore, EventReceiver,
        FlushPolicy, FrameStream, InMemoryConversationStore, NoopStreamSessionHooks,
        PersistenceBuffer, SessionOutcome, StreamSessionHooks, TurnRequest,
    };
    pub use qcommon::{ChatId, MessageId};
}

pub use bridge::{DEFAULT_EVENT_CAPACITY, EventReceiver, spawn_event_bridge};
pub use buffer::{FlushPolicy, PersistenceBuffer};
pub use error::{ChatError, ChatErrorKind};
pub use hooks::{NoopStreamSessionHooks, StreamSessionHooks};
pub use service::{ChatService, FrameStream};
pub use store::{ChatFuture, ConversationStore, InMemoryConversationStore};
pub use types::{
    ChatTurnPayload, PayloadAttachment, PayloadMessage, SessionOutcome, TurnRequest,
};
