//! Common imports for most quill applications.

pub use crate::{
    AdapterBuildConfig, RuntimeBundle, build_adapter_registry, build_adapter_registry_with,
    build_runtime, build_runtime_with_sqlite, build_runtime_with_store,
    openrouter_attribution_headers,
};
pub use qchat::{
    ChatError, ChatErrorKind, ChatService, ChatTurnPayload, ConversationStore, FlushPolicy,
    FrameStream, InMemoryConversationStore, SessionOutcome, StreamSessionHooks, TurnRequest,
};
pub use qcommon::{BoxFuture, ChatId, MessageId};
pub use qmemory::{PostgresConversationStore, PostgresStoreConfig, SqliteConversationStore};
pub use qobserve::{MetricsStreamHooks, TracingStreamHooks};
pub use qprovider::{
    AdapterRegistry, Attachment, CredentialManager, Message, ModelCatalog, ModelSpec,
    ProviderAdapter, ProviderError, ProviderErrorKind, ProviderId, ProviderModel,
    ProviderRequest, Role, StreamEvent,
};
