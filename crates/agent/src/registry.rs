//! Name-keyed tool registration.

use crate::tool::{EngineBridge, ToolHandler};
use crate::tools;
use indexmap::IndexMap;
use llm::ToolDefinition;
use std::sync::Arc;
use tracing::info;

/// Registered tools in stable insertion order. Definitions are handed to the
/// model in that order every round, so re-registering a name keeps its
/// original position (prompt determinism) while the new handler wins.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: IndexMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in graph tools; the engine push/sync tools are added only
    /// when a bridge is available.
    pub fn with_builtin_tools(bridge: Option<Arc<dyn EngineBridge>>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(tools::CreateNode));
        registry.register(Arc::new(tools::UpdateNode));
        registry.register(Arc::new(tools::DeleteNode));
        registry.register(Arc::new(tools::ConnectPins));
        registry.register(Arc::new(tools::DisconnectPins));
        registry.register(Arc::new(tools::CreateComment));
        registry.register(Arc::new(tools::CreateVariable));
        registry.register(Arc::new(tools::AutoLayout));
        registry.register(Arc::new(tools::GetGraphState));
        registry.register(Arc::new(tools::AskUser));
        if let Some(bridge) = bridge {
            registry.register(Arc::new(tools::PushToEngine::new(bridge.clone())));
            registry.register(Arc::new(tools::SyncFromEngine::new(bridge)));
        }
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        info!(tool = handler.name(), "registered tool");
        self.handlers.insert(handler.name(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers.values().map(|h| h.definition()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn definitions_keep_registration_order() {
        let registry = ToolRegistry::with_builtin_tools(None);
        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names[0], "create_node");
        assert_eq!(names.last().unwrap(), "ask_user");
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn reregistering_keeps_position_and_replaces_handler() {
        let mut registry = ToolRegistry::with_builtin_tools(None);
        registry.register(Arc::new(crate::tools::CreateNode));
        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names[0], "create_node");
        assert_eq!(names.len(), 10);
    }
}
