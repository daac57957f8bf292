//! The hard boundary between model-chosen tool calls and tool logic.

use crate::{ToolRegistry, ToolResult};
use blueprint::StateManager;
use tracing::warn;

/// Executes tool calls by name. Nothing a tool does can escape this
/// boundary as an error: unknown names, unparseable arguments and handler
/// failures all come back as failed [`ToolResult`]s.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn execute(
        &self,
        name: &str,
        arguments_json: &str,
        state: &mut StateManager,
    ) -> ToolResult {
        let Some(handler) = self.registry.get(name) else {
            warn!(tool = name, "unknown tool requested");
            return ToolResult::fail(format!("Unknown tool '{name}'"));
        };

        let args: serde_json::Value = match serde_json::from_str(arguments_json) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = name, error = %e, "malformed tool arguments");
                return ToolResult::fail(format!("Invalid JSON arguments for '{name}': {e}"));
            }
        };

        match handler.execute(&args, state).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "tool handler failed");
                ToolResult::fail(format!("Tool '{name}' failed: {e}"))
            }
        }
    }
}
