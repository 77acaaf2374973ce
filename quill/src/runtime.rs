//! Runtime assembly helpers: environment credentials, default catalog,
//! storage, and the chat service in one call.

use std::sync::Arc;

use qchat::{ChatError, ChatService, ConversationStore, InMemoryConversationStore};
use qmemory::{SqliteConversationStore, default_sqlite_path};
use qprovider::{AdapterRegistry, CredentialManager, ModelCatalog};

use crate::providers::build_adapter_registry;

/// Everything a serving process needs, with the shared pieces exposed for
/// route handlers and diagnostics.
pub struct RuntimeBundle {
    pub service: ChatService,
    pub registry: Arc<AdapterRegistry>,
    pub catalog: Arc<ModelCatalog>,
    pub credentials: Arc<CredentialManager>,
    pub store: Arc<dyn ConversationStore>,
}

/// In-memory storage; suitable for tests and ephemeral deployments.
pub fn build_runtime() -> Result<RuntimeBundle, ChatError> {
    build_runtime_with_store(Arc::new(InMemoryConversationStore::new()))
}

/// SQLite storage at `QUILL_SQLITE_PATH` or the default location.
pub fn build_runtime_with_sqlite() -> Result<RuntimeBundle, ChatError> {
    let store = SqliteConversationStore::new(default_sqlite_path())?;
    build_runtime_with_store(Arc::new(store))
}

pub fn build_runtime_with_store(
    store: Arc<dyn ConversationStore>,
) -> Result<RuntimeBundle, ChatError> {
    let credentials = Arc::new(CredentialManager::from_env());
    let catalog = Arc::new(ModelCatalog::with_default_models());
    let registry = Arc::new(
        build_adapter_registry(credentials.clone(), catalog.clone()).map_err(ChatError::from)?,
    );

    let service = ChatService::new(
        registry.clone(),
        store.clone(),
        catalog.clone(),
        credentials.clone(),
    );

    Ok(RuntimeBundle {
        service,
        registry,
        catalog,
        credentials,
        store,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_bundle_wires_the_default_catalog() {
        let bundle = build_runtime().expect("runtime should build");
        assert!(bundle.catalog.is_allowed("openai:gpt-5-mini"));
        assert_eq!(bundle.registry.len(), 6);
    }
}
