//! Engine round-trip tools, generic over the [`EngineBridge`] seam.

use super::parse_args;
use crate::{AgentResult, EngineBridge, ToolHandler, ToolResult};
use async_trait::async_trait;
use blueprint::StateManager;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeArgs {
    blueprint_name: String,
}

pub struct PushToEngine {
    bridge: Arc<dyn EngineBridge>,
}

impl PushToEngine {
    pub fn new(bridge: Arc<dyn EngineBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl ToolHandler for PushToEngine {
    fn name(&self) -> &'static str {
        "push_to_engine"
    }

    fn description(&self) -> &'static str {
        "Push the current blueprint state to a connected engine editor, creating or updating the blueprint there."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "blueprintName": { "type": "string", "description": "Target blueprint name in the engine to push to" }
            },
            "required": ["blueprintName"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: BridgeArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        match self
            .bridge
            .push_blueprint(&args.blueprint_name, state.graph())
            .await
        {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Pushed blueprint with {} nodes to engine as '{}'",
                state.graph().nodes.len(),
                args.blueprint_name
            ))),
            Err(e) => {
                warn!(blueprint = %args.blueprint_name, error = %e, "engine push failed");
                Ok(ToolResult::fail(format!("Failed to push to engine: {e}")))
            }
        }
    }
}

pub struct SyncFromEngine {
    bridge: Arc<dyn EngineBridge>,
}

impl SyncFromEngine {
    pub fn new(bridge: Arc<dyn EngineBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl ToolHandler for SyncFromEngine {
    fn name(&self) -> &'static str {
        "sync_from_engine"
    }

    fn description(&self) -> &'static str {
        "Import a blueprint from a connected engine editor, replacing the current canvas with its nodes and connections."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "blueprintName": { "type": "string", "description": "Name of the blueprint to import from the engine" }
            },
            "required": ["blueprintName"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: BridgeArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let imported = match self.bridge.import_blueprint(&args.blueprint_name).await {
            Ok(imported) => imported,
            Err(e) => {
                warn!(blueprint = %args.blueprint_name, error = %e, "engine import failed");
                return Ok(ToolResult::fail(format!(
                    "Failed to import from engine: {e}"
                )));
            }
        };

        let message = format!(
            "Imported blueprint '{}' with {} nodes and {} connections",
            args.blueprint_name,
            imported.nodes.len(),
            imported.connections.len()
        );
        let delta = state.replace_contents(imported)?;
        Ok(ToolResult::ok_with(message, vec![delta]))
    }
}
