//! Built-in tool handlers.

mod annotations;
mod connections;
mod engine;
mod inspect;
mod layout;
mod nodes;

pub use annotations::{CreateComment, CreateVariable};
pub use connections::{ConnectPins, DisconnectPins};
pub use engine::{PushToEngine, SyncFromEngine};
pub use inspect::{AskUser, GetGraphState};
pub use layout::AutoLayout;
pub use nodes::{CreateNode, DeleteNode, UpdateNode};

use crate::ToolResult;
use serde::de::DeserializeOwned;

/// Deserialize the arguments object into the handler's typed shape; a shape
/// mismatch is a failed result, never an error.
fn parse_args<T: DeserializeOwned>(args: &serde_json::Value) -> Result<T, ToolResult> {
    serde_json::from_value(args.clone())
        .map_err(|e| ToolResult::fail(format!("Invalid arguments: {e}")))
}
