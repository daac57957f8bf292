//! Node lifecycle tools: create, update, delete.

use super::parse_args;
use crate::{AgentResult, ToolHandler, ToolResult};
use async_trait::async_trait;
use blueprint::{Node, NodeStyle, Pin, PinDirection, PinType, StateManager};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinSpec {
    name: String,
    #[serde(rename = "type")]
    pin_type: PinType,
    #[serde(default)]
    default_value: Option<String>,
}

impl PinSpec {
    fn into_pin(self, direction: PinDirection) -> Pin {
        let pin = Pin::new(self.name, self.pin_type, direction);
        match self.default_value {
            Some(value) => pin.with_default(value),
            None => pin,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateNodeArgs {
    title: String,
    category: String,
    style: NodeStyle,
    input_pins: Vec<PinSpec>,
    output_pins: Vec<PinSpec>,
    #[serde(default)]
    position_x: Option<f64>,
    #[serde(default)]
    position_y: Option<f64>,
    #[serde(default)]
    is_compact: bool,
}

pub struct CreateNode;

#[async_trait]
impl ToolHandler for CreateNode {
    fn name(&self) -> &'static str {
        "create_node"
    }

    fn description(&self) -> &'static str {
        "Create a new Blueprint node with specified title, category, style, pins, and position."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Display title of the node (e.g., 'Print String', 'Event BeginPlay')" },
                "category": { "type": "string", "description": "Node category (e.g., 'Flow Control', 'String', 'Utilities')" },
                "style": { "type": "string", "enum": ["Event", "Function", "Pure", "FlowControl", "Variable", "Macro"], "description": "Visual style determining header color" },
                "inputPins": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "type": { "type": "string", "enum": ["Exec", "Bool", "Int", "Float", "String", "Vector", "Rotator", "Transform", "Object", "Class", "Wildcard"] },
                            "defaultValue": { "type": "string" }
                        },
                        "required": ["name", "type"]
                    }
                },
                "outputPins": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "type": { "type": "string", "enum": ["Exec", "Bool", "Int", "Float", "String", "Vector", "Rotator", "Transform", "Object", "Class", "Wildcard"] }
                        },
                        "required": ["name", "type"]
                    }
                },
                "positionX": { "type": "number", "description": "X coordinate on canvas" },
                "positionY": { "type": "number", "description": "Y coordinate on canvas" },
                "isCompact": { "type": "boolean", "description": "Whether to render as compact node" }
            },
            "required": ["title", "category", "style", "inputPins", "outputPins"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: CreateNodeArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let mut node = Node::new(args.title, args.category, args.style);
        node.position_x = args
            .position_x
            .unwrap_or(state.graph().nodes.len() as f64 * 300.0);
        node.position_y = args.position_y.unwrap_or(200.0);
        node.is_compact = args.is_compact;
        for pin in args.input_pins {
            node.input_pins.push(pin.into_pin(PinDirection::Input));
        }
        for pin in args.output_pins {
            node.output_pins.push(pin.into_pin(PinDirection::Output));
        }

        let message = format!("Created node '{}' with id '{}'", node.title, node.id);
        let delta = state.add_node(node)?;
        Ok(ToolResult::ok_with(message, vec![delta]))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateNodeArgs {
    node_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    position_x: Option<f64>,
    #[serde(default)]
    position_y: Option<f64>,
    #[serde(default)]
    pin_defaults: IndexMap<String, String>,
}

pub struct UpdateNode;

#[async_trait]
impl ToolHandler for UpdateNode {
    fn name(&self) -> &'static str {
        "update_node"
    }

    fn description(&self) -> &'static str {
        "Update an existing node's title, position, or pin default values."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "nodeId": { "type": "string", "description": "ID of the node to update" },
                "title": { "type": "string", "description": "New title" },
                "positionX": { "type": "number" },
                "positionY": { "type": "number" },
                "pinDefaults": {
                    "type": "object",
                    "description": "Map of pin name to new default value",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["nodeId"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: UpdateNodeArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let Some(node) = state.graph().node(&args.node_id) else {
            return Ok(ToolResult::fail(format!(
                "Node '{}' not found",
                args.node_id
            )));
        };
        let mut node = node.clone();

        if let Some(title) = args.title {
            node.title = title;
        }
        if let Some(x) = args.position_x {
            node.position_x = x;
        }
        if let Some(y) = args.position_y {
            node.position_y = y;
        }
        for (pin_name, value) in args.pin_defaults {
            if let Some(pin) = node
                .input_pins
                .iter_mut()
                .chain(node.output_pins.iter_mut())
                .find(|p| p.name == pin_name)
            {
                pin.default_value = Some(value);
            }
        }

        let message = format!("Updated node '{}'", node.title);
        let delta = state.update_node(node)?;
        Ok(ToolResult::ok_with(message, vec![delta]))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteNodeArgs {
    node_id: String,
}

pub struct DeleteNode;

#[async_trait]
impl ToolHandler for DeleteNode {
    fn name(&self) -> &'static str {
        "delete_node"
    }

    fn description(&self) -> &'static str {
        "Delete a node and all its connections from the blueprint."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "nodeId": { "type": "string", "description": "ID of the node to delete" }
            },
            "required": ["nodeId"]
        })
    }

    async fn execute(&self, args: &Value, state: &mut StateManager) -> AgentResult<ToolResult> {
        let args: DeleteNodeArgs = match parse_args(args) {
            Ok(args) => args,
            Err(fail) => return Ok(fail),
        };

        let Some(node) = state.graph().node(&args.node_id) else {
            return Ok(ToolResult::fail(format!(
                "Node '{}' not found",
                args.node_id
            )));
        };
        let title = node.title.clone();

        let deltas = state.remove_node(&args.node_id)?;
        let message = format!(
            "Deleted node '{}' and {} connection(s)",
            title,
            deltas.len() - 1
        );
        Ok(ToolResult::ok_with(message, deltas))
    }
}
