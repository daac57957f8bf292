//! The tool capability contract and the engine bridge seam.

use crate::AgentResult;
use async_trait::async_trait;
use blueprint::{Blueprint, Delta, StateManager};
use llm::ToolDefinition;

/// What a tool execution produced: a human-readable result message for the
/// transcript, the graph deltas it emitted, and optionally a question that
/// ends the turn so the user can answer.
#[derive(Debug, Clone, Default)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    pub deltas: Vec<Delta>,
    pub ask_user: Option<String>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn ok_with(message: impl Into<String>, deltas: Vec<Delta>) -> Self {
        Self {
            success: true,
            message: message.into(),
            deltas,
            ask_user: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// One tool the model can call. Handlers get exclusive access to the
/// session's state manager for the duration of the call; execution within a
/// turn is strictly sequential.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON-Schema for the arguments object.
    fn parameters(&self) -> serde_json::Value;

    async fn execute(
        &self,
        args: &serde_json::Value,
        state: &mut StateManager,
    ) -> AgentResult<ToolResult>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

/// Transport to a connected engine editor. The two engine tools are generic
/// over this seam; the wire protocol behind it is not this crate's concern.
#[async_trait]
pub trait EngineBridge: Send + Sync {
    /// Push the full graph to the engine under the given blueprint name.
    async fn push_blueprint(&self, name: &str, graph: &Blueprint) -> anyhow::Result<()>;

    /// Import the named blueprint from the engine.
    async fn import_blueprint(&self, name: &str) -> anyhow::Result<Blueprint>;
}
