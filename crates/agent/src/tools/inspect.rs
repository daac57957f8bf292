//! Read-only tools: graph inspection and asking the user.

use super::parse_args;
use crate::{AgentResult, ToolHandler, ToolResult};
use async_trait::async_trait;
use blueprint::StateManager;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt::Write;

pub struct GetGraphState;

#[async_trait]
impl ToolHandler for GetGraphState {
    fn name(&self) -> &'static str {
        "get_graph_state"
    }

    fn description(&self) -> &'static str {
        "Get the current state of the blueprint, including all nodes, connections, variables, and comments."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let graph = state.graph();
        let mut summary = String::new();
        let _ = writeln!(summary, "Blueprint: {} (v{})", graph.name, graph.version);
        let _ = writeln!(summary, "Nodes ({}):", graph.nodes.len());
        for node in &graph.nodes {
            let _ = writeln!(
                summary,
                "  - [{}] {} ({:?}) at ({}, {})",
                node.id, node.title, node.style, node.position_x, node.position_y
            );
            for pin in &node.input_pins {
                let default = pin
                    .default_value
                    .as_ref()
                    .map(|v| format!(" = {v}"))
                    .unwrap_or_default();
                let connected = if pin.is_connected { " [connected]" } else { "" };
                let _ = writeln!(
                    summary,
                    "    IN: {} ({:?}){default}{connected}",
                    pin.name, pin.pin_type
                );
            }
            for pin in &node.output_pins {
                let connected = if pin.is_connected { " [connected]" } else { "" };
                let _ = writeln!(
                    summary,
                    "    OUT: {} ({:?}){connected}",
                    pin.name, pin.pin_type
                );
            }
        }
        let _ = writeln!(summary, "Connections ({}):", graph.connections.len());
        for conn in &graph.connections {
            let _ = writeln!(
                summary,
                "  - {}.{} -> {}.{} ({:?})",
                conn.source_node_id,
                conn.source_pin_id,
                conn.target_node_id,
                conn.target_pin_id,
                conn.pin_type
            );
        }
        let _ = writeln!(summary, "Variables ({}):", graph.variables.len());
        for variable in &graph.variables {
            let default = variable
                .default_value
                .as_ref()
                .map(|v| format!(" = {v}"))
                .unwrap_or_default();
            let _ = writeln!(
                summary,
                "  - {}: {:?}{default}",
                variable.name, variable.var_type
            );
        }

        Ok(ToolResult::ok(summary))
    }
}

#[derive(Debug, Deserialize)]
struct AskUserArgs {
    question: String,
}

pub struct AskUser;

#[async_trait]
impl ToolHandler for AskUser {
    fn name(&self) -> &'static str {
        "ask_user"
    }

    fn description(&self) -> &'static str {
        "Ask the user a clarifying question when more information is needed to build the blueprint."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "The question to ask the user" }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, args: &Value, _state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: AskUserArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };
        Ok(ToolResult {
            success: true,
            message: args.question.clone(),
            deltas: Vec::new(),
            ask_user: Some(args.question),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{CreateNode, CreateVariable};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn summary_lists_nodes_and_variables() {
        let mut state = StateManager::new();
        CreateNode
            .execute(
                &json!({
                    "title": "Event BeginPlay", "category": "Events", "style": "Event",
                    "inputPins": [],
                    "outputPins": [{ "name": "Exec", "type": "Exec" }]
                }),
                &mut state,
            )
            .await
            .unwrap();
        CreateVariable
            .execute(&json!({ "name": "Health", "type": "Float" }), &mut state)
            .await
            .unwrap();

        let result = GetGraphState.execute(&json!({}), &mut state).await.unwrap();
        assert!(result.success);
        assert!(result.deltas.is_empty());
        assert!(result.message.contains("Event BeginPlay"));
        assert!(result.message.contains("OUT: Exec (Exec)"));
        assert!(result.message.contains("Health: Float"));
    }

    #[tokio::test]
    async fn ask_user_carries_the_question() {
        let mut state = StateManager::new();
        let result = AskUser
            .execute(&json!({ "question": "Which actor?" }), &mut state)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.ask_user.as_deref(), Some("Which actor?"));
        assert_eq!(result.message, "Which actor?");
    }
}
