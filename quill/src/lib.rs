//! Unified facade over the quill workspace crates.
//!
//! This crate is designed to be the single dependency for most applications:
//! it re-exports the core crates and provides convenience builders wiring
//! credentials, the model catalog, vendor adapters, and storage into a ready
//! [`ChatService`].
//!
//! ```rust
//! use quill::prelude::*;
//!
//! let bundle = build_runtime().expect("runtime should build");
//! assert!(bundle.catalog.is_allowed("anthropic:claude-sonnet-4-6"));
//! ```

pub mod prelude;
mod providers;
mod runtime;

pub use qchat;
pub use qcommon;
pub use qmemory;
pub use qobserve;
pub use qprovider;

pub use qchat::{
    ChatError, ChatErrorKind, ChatService, ChatTurnPayload, ConversationStore, EventReceiver,
    FlushPolicy, FrameStream, InMemoryConversationStore, NoopStreamSessionHooks,
    PayloadAttachment, PayloadMessage, PersistenceBuffer, SessionOutcome, StreamSessionHooks,
    TurnRequest, encoder, spawn_event_bridge,
};
pub use qcommon::{BoxFuture, ChatId, MessageId};
pub use qmemory::{
    PostgresConversationStore, PostgresStoreConfig, SqliteConversationStore, default_sqlite_path,
};
pub use qobserve::{MetricsStreamHooks, TracingStreamHooks};
pub use qprovider::{
    AdapterRegistry, Attachment, BoxedEventIterator, ComposedMessage, ContentPart,
    CredentialManager, HttpStreamTransport, ImageMime, Message, MessageContent, ModelCatalog,
    ModelSpec, ProviderAdapter, ProviderError, ProviderErrorKind, ProviderId, ProviderModel,
    ProviderRequest, Role, SecretString, StreamEvent, StreamTransport, VecEventIterator,
    WireRequest, attach_to_messages,
};

pub use providers::{
    AdapterBuildConfig, build_adapter_registry, build_adapter_registry_with,
    openrouter_attribution_headers,
};
pub use runtime::{
    RuntimeBundle, build_runtime, build_runtime_with_sqlite, build_runtime_with_store,
};
