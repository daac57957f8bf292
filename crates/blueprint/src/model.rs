//! Wire-shaped domain types for the blueprint graph.
//!
//! Entities reference each other by id only (pins carry ids, connections
//! carry node/pin ids). Field names serialize as camelCase because the
//! canvas client consumes these shapes directly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// The type carried by a pin, a connection, or a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    Exec,
    Bool,
    Int,
    Float,
    String,
    Vector,
    Rotator,
    Transform,
    Object,
    Class,
    Byte,
    Name,
    Text,
    Enum,
    Struct,
    Array,
    Set,
    Map,
    Delegate,
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
}

/// Display grouping for a node header (events red, functions blue, pure
/// green, flow control grey).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStyle {
    Event,
    Function,
    Pure,
    FlowControl,
    Variable,
    Macro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub pin_type: PinType,
    pub direction: PinDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub is_connected: bool,
}

impl Pin {
    pub fn new(name: impl Into<String>, pin_type: PinType, direction: PinDirection) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            pin_type,
            direction,
            default_value: None,
            sub_type: None,
            is_connected: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub title: String,
    pub category: String,
    pub style: NodeStyle,
    pub input_pins: Vec<Pin>,
    pub output_pins: Vec<Pin>,
    pub position_x: f64,
    pub position_y: f64,
    #[serde(default)]
    pub is_compact: bool,
}

impl Node {
    pub fn new(title: impl Into<String>, category: impl Into<String>, style: NodeStyle) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            category: category.into(),
            style,
            input_pins: Vec::new(),
            output_pins: Vec::new(),
            position_x: 0.0,
            position_y: 0.0,
            is_compact: false,
        }
    }

    pub fn input_pin(&self, name: &str) -> Option<&Pin> {
        self.input_pins.iter().find(|p| p.name == name)
    }

    pub fn output_pin(&self, name: &str) -> Option<&Pin> {
        self.output_pins.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub source_pin_id: String,
    pub target_node_id: String,
    pub target_pin_id: String,
    pub pin_type: PinType,
}

impl Connection {
    pub fn new(
        source_node_id: impl Into<String>,
        source_pin_id: impl Into<String>,
        target_node_id: impl Into<String>,
        target_pin_id: impl Into<String>,
        pin_type: PinType,
    ) -> Self {
        Self {
            id: new_id(),
            source_node_id: source_node_id.into(),
            source_pin_id: source_pin_id.into(),
            target_node_id: target_node_id.into(),
            target_pin_id: target_pin_id.into(),
            pin_type,
        }
    }

    /// Whether this connection touches the given node on either end.
    pub fn touches_node(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            position_x: 0.0,
            position_y: 0.0,
            width: 400.0,
            height: 200.0,
            color: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: PinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub category: String,
    pub is_editable: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, var_type: PinType) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            var_type,
            default_value: None,
            category: String::new(),
            is_editable: true,
        }
    }
}

/// The whole graph. `version` increases by exactly one per applied mutation
/// and never rolls back, including across undo/redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub comments: Vec<Comment>,
    pub variables: Vec<Variable>,
    pub version: u64,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self {
            id: new_id(),
            name: "NewBlueprint".to_string(),
            nodes: Vec::new(),
            connections: Vec::new(),
            comments: Vec::new(),
            variables: Vec::new(),
            version: 0,
        }
    }
}

impl Blueprint {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }
}

/// One atomic, observable graph mutation, tagged with the version the graph
/// reached when it was applied. Serializes to the client wire shape
/// `{type, node?|connection?|comment?|variable?|removedId?|fullState?, version}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Delta {
    NodeAdded { node: Node, version: u64 },
    NodeRemoved { removed_id: String, version: u64 },
    NodeUpdated { node: Node, version: u64 },
    ConnectionAdded { connection: Connection, version: u64 },
    ConnectionRemoved { removed_id: String, version: u64 },
    CommentAdded { comment: Comment, version: u64 },
    CommentRemoved { removed_id: String, version: u64 },
    VariableAdded { variable: Variable, version: u64 },
    VariableRemoved { removed_id: String, version: u64 },
    FullSync { full_state: Blueprint, version: u64 },
}

impl Delta {
    /// The graph version this delta produced.
    pub fn version(&self) -> u64 {
        match self {
            Delta::NodeAdded { version, .. }
            | Delta::NodeRemoved { version, .. }
            | Delta::NodeUpdated { version, .. }
            | Delta::ConnectionAdded { version, .. }
            | Delta::ConnectionRemoved { version, .. }
            | Delta::CommentAdded { version, .. }
            | Delta::CommentRemoved { version, .. }
            | Delta::VariableAdded { version, .. }
            | Delta::VariableRemoved { version, .. }
            | Delta::FullSync { version, .. } => *version,
        }
    }
}
