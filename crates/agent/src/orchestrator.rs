//! The multi-round turn loop.

use crate::{AgentUpdate, SYSTEM_PROMPT, ToolExecutor, ToolRegistry, UpdateSink};
use blueprint::StateManager;
use futures::StreamExt;
use indexmap::IndexMap;
use llm::{ChatMessage, ChatProvider, StreamChunk, ToolCall};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// How a turn ended. Cancellation suppresses `StreamComplete`; every other
/// path emits it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Cancelled,
}

/// Drives one user turn: stream a completion, execute the tool calls it
/// produced, feed results back, repeat until the model stops asking for
/// tools, asks the user something, or the round cap is hit.
pub struct AgentOrchestrator {
    executor: ToolExecutor,
    max_rounds: usize,
}

impl AgentOrchestrator {
    pub fn new(registry: ToolRegistry, max_rounds: usize) -> Self {
        Self {
            executor: ToolExecutor::new(registry),
            max_rounds,
        }
    }

    pub async fn process_message(
        &self,
        provider: Arc<dyn ChatProvider>,
        state: &mut StateManager,
        transcript: &mut Vec<ChatMessage>,
        user_message: &str,
        sink: &UpdateSink,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        transcript.push(ChatMessage::user(user_message));
        let tools = self.executor.registry().definitions();

        for round in 0..self.max_rounds {
            debug!(round, provider = provider.id(), "starting model round");

            let stream = provider
                .stream_completion(transcript, &tools, SYSTEM_PROMPT, cancel.clone())
                .await;
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "completion request failed");
                    sink.push(AgentUpdate::Error {
                        message: e.to_string(),
                    });
                    sink.push(AgentUpdate::StreamComplete);
                    return TurnOutcome::Completed;
                }
            };

            let mut text = String::new();
            // Argument buffers keyed by call id; moved to `completed` when
            // the provider freezes them.
            let mut pending: IndexMap<String, (String, String)> = IndexMap::new();
            let mut completed: Vec<ToolCall> = Vec::new();

            while let Some(item) = stream.next().await {
                if cancel.is_cancelled() {
                    info!("turn cancelled mid-stream");
                    return TurnOutcome::Cancelled;
                }
                match item {
                    Ok(StreamChunk::Text(delta)) => {
                        text.push_str(&delta);
                        sink.push(AgentUpdate::TextDelta { text: delta });
                    }
                    Ok(StreamChunk::ToolCallStart { id, name }) => {
                        sink.push(AgentUpdate::ToolCallStarted {
                            name: name.clone(),
                            id: id.clone(),
                        });
                        pending.insert(id, (name, String::new()));
                    }
                    Ok(StreamChunk::ToolCallDelta { id, fragment }) => {
                        if let Some((_, buffer)) = pending.get_mut(&id) {
                            buffer.push_str(&fragment);
                        }
                    }
                    Ok(StreamChunk::ToolCallEnd { id }) => {
                        if let Some((name, arguments)) = pending.shift_remove(&id) {
                            completed.push(ToolCall::new(id, name, arguments));
                        }
                    }
                    Ok(StreamChunk::Done { stop_reason }) => {
                        debug!(?stop_reason, "model round finished");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "stream failed mid-turn");
                        sink.push(AgentUpdate::Error {
                            message: e.to_string(),
                        });
                        sink.push(AgentUpdate::StreamComplete);
                        return TurnOutcome::Completed;
                    }
                }
            }

            // The adapters close their streams without a `Done` once the
            // token trips, so an exhausted stream needs its own check.
            if cancel.is_cancelled() {
                info!("turn cancelled, stream closed early");
                return TurnOutcome::Cancelled;
            }

            transcript.push(ChatMessage::assistant(
                (!text.is_empty()).then_some(text),
                completed.clone(),
            ));

            if completed.is_empty() {
                sink.push(AgentUpdate::StreamComplete);
                return TurnOutcome::Completed;
            }

            let mut asked_user = false;
            for call in &completed {
                if cancel.is_cancelled() {
                    info!("turn cancelled between tool calls");
                    return TurnOutcome::Cancelled;
                }
                info!(tool = %call.name, id = %call.id, "executing tool call");
                let result = self
                    .executor
                    .execute(&call.name, &call.arguments_json, state)
                    .await;

                // Deltas go out before the next tool call runs.
                for delta in &result.deltas {
                    sink.push(AgentUpdate::GraphDelta {
                        delta: delta.clone(),
                    });
                }
                if let Some(question) = &result.ask_user {
                    sink.push(AgentUpdate::AskUser {
                        question: question.clone(),
                    });
                    asked_user = true;
                }
                sink.push(AgentUpdate::ToolCallCompleted {
                    name: call.name.clone(),
                    id: call.id.clone(),
                    message: result.message.clone(),
                });
                transcript.push(ChatMessage::tool_result(
                    call.id.clone(),
                    call.name.clone(),
                    result.message,
                ));
            }

            // Asking the user always ends the turn, even though the rest of
            // the batch already ran.
            if asked_user {
                sink.push(AgentUpdate::StreamComplete);
                return TurnOutcome::Completed;
            }
        }

        // Round cap reached: graceful truncation, not an error.
        info!(max_rounds = self.max_rounds, "round cap reached");
        sink.push(AgentUpdate::StreamComplete);
        TurnOutcome::Completed
    }
}
