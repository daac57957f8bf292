//! Runtime provider selection by name.

use crate::ChatProvider;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::info;

/// Name-keyed set of configured providers. Registration order is preserved
/// so the first registered provider doubles as the default.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: IndexMap<&'static str, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        info!(provider = provider.id(), "registered chat provider");
        self.providers.insert(provider.id(), provider);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(id).cloned()
    }

    pub fn default_provider(&self) -> Option<Arc<dyn ChatProvider>> {
        self.providers.values().next().cloned()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
