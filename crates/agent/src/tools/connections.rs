//! Pin wiring tools.

use super::parse_args;
use crate::{AgentResult, ToolHandler, ToolResult};
use async_trait::async_trait;
use blueprint::{Connection, PinType, StateManager};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinPairArgs {
    source_node_id: String,
    source_pin_name: String,
    target_node_id: String,
    target_pin_name: String,
}

pub struct ConnectPins;

#[async_trait]
impl ToolHandler for ConnectPins {
    fn name(&self) -> &'static str {
        "connect_pins"
    }

    fn description(&self) -> &'static str {
        "Connect an output pin of one node to an input pin of another node."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sourceNodeId": { "type": "string", "description": "ID of the source node" },
                "sourcePinName": { "type": "string", "description": "Name of the output pin on source node" },
                "targetNodeId": { "type": "string", "description": "ID of the target node" },
                "targetPinName": { "type": "string", "description": "Name of the input pin on target node" }
            },
            "required": ["sourceNodeId", "sourcePinName", "targetNodeId", "targetPinName"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: PinPairArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let graph = state.graph();
        let Some(source_node) = graph.node(&args.source_node_id) else {
            return Ok(ToolResult::fail(format!(
                "Source node '{}' not found",
                args.source_node_id
            )));
        };
        let Some(target_node) = graph.node(&args.target_node_id) else {
            return Ok(ToolResult::fail(format!(
                "Target node '{}' not found",
                args.target_node_id
            )));
        };
        let Some(source_pin) = source_node.output_pin(&args.source_pin_name) else {
            return Ok(ToolResult::fail(format!(
                "Output pin '{}' not found on node '{}'",
                args.source_pin_name, source_node.title
            )));
        };
        let Some(target_pin) = target_node.input_pin(&args.target_pin_name) else {
            return Ok(ToolResult::fail(format!(
                "Input pin '{}' not found on node '{}'",
                args.target_pin_name, target_node.title
            )));
        };

        // Exec fans out freely and Wildcard matches anything; everything
        // else must match exactly.
        if source_pin.pin_type != PinType::Exec
            && source_pin.pin_type != PinType::Wildcard
            && target_pin.pin_type != PinType::Wildcard
            && source_pin.pin_type != target_pin.pin_type
        {
            return Ok(ToolResult::fail(format!(
                "Type mismatch: cannot connect {:?} to {:?}",
                source_pin.pin_type, target_pin.pin_type
            )));
        }

        let connection = Connection::new(
            args.source_node_id,
            source_pin.id.clone(),
            args.target_node_id,
            target_pin.id.clone(),
            source_pin.pin_type,
        );
        let message = format!(
            "Connected {}.{} -> {}.{}",
            source_node.title, args.source_pin_name, target_node.title, args.target_pin_name
        );
        let delta = state.add_connection(connection)?;
        Ok(ToolResult::ok_with(message, vec![delta]))
    }
}

pub struct DisconnectPins;

#[async_trait]
impl ToolHandler for DisconnectPins {
    fn name(&self) -> &'static str {
        "disconnect_pins"
    }

    fn description(&self) -> &'static str {
        "Remove a connection between two pins."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sourceNodeId": { "type": "string", "description": "ID of the source node" },
                "sourcePinName": { "type": "string", "description": "Name of the output pin" },
                "targetNodeId": { "type": "string", "description": "ID of the target node" },
                "targetPinName": { "type": "string", "description": "Name of the input pin" }
            },
            "required": ["sourceNodeId", "sourcePinName", "targetNodeId", "targetPinName"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: PinPairArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let graph = state.graph();
        let (Some(source_node), Some(target_node)) = (
            graph.node(&args.source_node_id),
            graph.node(&args.target_node_id),
        ) else {
            return Ok(ToolResult::fail("Source or target node not found"));
        };
        let (Some(source_pin), Some(target_pin)) = (
            source_node.output_pin(&args.source_pin_name),
            target_node.input_pin(&args.target_pin_name),
        ) else {
            return Ok(ToolResult::fail("Source or target pin not found"));
        };

        let connection = graph.connections.iter().find(|c| {
            c.source_node_id == args.source_node_id
                && c.source_pin_id == source_pin.id
                && c.target_node_id == args.target_node_id
                && c.target_pin_id == target_pin.id
        });
        let Some(connection) = connection else {
            return Ok(ToolResult::fail("Connection not found"));
        };
        let connection_id = connection.id.clone();
        let message = format!(
            "Disconnected {}.{} from {}.{}",
            source_node.title, args.source_pin_name, target_node.title, args.target_pin_name
        );

        let delta = state.remove_connection(&connection_id)?;
        Ok(ToolResult::ok_with(message, vec![delta]))
    }
}
