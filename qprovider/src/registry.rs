//! Adapter registry for runtime vendor lookup and swapping.
//!
//! ```rust
//! use qprovider::AdapterRegistry;
//!
//! let registry = AdapterRegistry::new();
//! assert!(registry.is_empty());
//! assert_eq!(registry.len(), 0);
//! ```

use std::sync::Arc;

use qcommon::Registry;

use crate::{ProviderAdapter, ProviderId};

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Registry<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<A>(&mut self, adapter: A)
    where
        A: ProviderAdapter + 'static,
    {
        self.adapters.insert(adapter.id(), Arc::new(adapter));
    }

    pub fn get(&self, provider_id: ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider_id).cloned()
    }

    pub fn remove(&mut self, provider_id: ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.remove(&provider_id)
    }

    pub fn contains(&self, provider_id: ProviderId) -> bool {
        self.adapters.contains_key(&provider_id)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
