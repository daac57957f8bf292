//! The provider capability trait and the canonical chunk sequence.

use crate::{ChatMessage, LlmResult, ToolDefinition};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// One normalized unit of streamed model output, uniform across backends.
///
/// Ordering guarantee: for a given call id, `ToolCallStart` precedes all of
/// its `ToolCallDelta`s, which precede exactly one `ToolCallEnd`; chunks for
/// different ids may interleave. `ToolCallDelta` fragments are raw text and
/// must never be parsed in isolation; only the full concatenation at
/// `ToolCallEnd` is guaranteed to be valid JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Assistant text delta.
    Text(String),
    /// A tool call opened; an argument buffer should be created for `id`.
    ToolCallStart { id: String, name: String },
    /// A raw JSON fragment for the call's argument buffer.
    ToolCallDelta { id: String, fragment: String },
    /// The call's arguments are complete.
    ToolCallEnd { id: String },
    /// The model round is over.
    Done { stop_reason: Option<String> },
}

/// Lazy, single-pass, non-restartable chunk sequence.
pub type ChunkStream = Pin<Box<dyn Stream<Item = LlmResult<StreamChunk>> + Send>>;

/// A streaming model backend. Implementations translate the canonical
/// transcript and tool schemas into the backend's native shapes, issue the
/// streaming request, and decode the backend's line framing into
/// [`StreamChunk`]s, skipping malformed lines and converting transport
/// failures into a terminal [`crate::LlmError`].
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stable provider name used for registry lookup.
    fn id(&self) -> &'static str;

    /// Whether the backend supports native tool calling.
    fn supports_tools(&self) -> bool {
        true
    }

    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system_prompt: &str,
        cancel: CancellationToken,
    ) -> LlmResult<ChunkStream>;
}
