//! Turn-loop behavior against scripted providers.

use agent::{AgentOrchestrator, AgentUpdate, ToolRegistry, TurnOutcome, UpdateSink};
use async_trait::async_trait;
use blueprint::StateManager;
use futures::stream;
use llm::{
    ChatMessage, ChatProvider, ChunkStream, LlmError, LlmResult, StreamChunk, ToolDefinition,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

/// Plays back one pre-recorded chunk script per round; once the scripts run
/// out it answers with a bare `Done` so the loop terminates.
struct ScriptedProvider {
    rounds: Mutex<VecDeque<Vec<Result<StreamChunk, String>>>>,
}

impl ScriptedProvider {
    fn new(rounds: Vec<Vec<Result<StreamChunk, String>>>) -> Arc<Self> {
        Arc::new(Self {
            rounds: Mutex::new(rounds.into()),
        })
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn stream_completion(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _system_prompt: &str,
        _cancel: CancellationToken,
    ) -> LlmResult<ChunkStream> {
        let round = self.rounds.lock().unwrap().pop_front().unwrap_or_else(|| {
            vec![Ok(StreamChunk::Done { stop_reason: None })]
        });
        Ok(Box::pin(stream::iter(
            round.into_iter().map(|r| r.map_err(LlmError::Stream)),
        )))
    }
}

/// Requests the same tool call every round, forever.
struct RelentlessProvider;

#[async_trait]
impl ChatProvider for RelentlessProvider {
    fn id(&self) -> &'static str {
        "relentless"
    }

    async fn stream_completion(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _system_prompt: &str,
        _cancel: CancellationToken,
    ) -> LlmResult<ChunkStream> {
        Ok(Box::pin(stream::iter(vec![
            Ok(StreamChunk::ToolCallStart {
                id: "tc_1".to_string(),
                name: "get_graph_state".to_string(),
            }),
            Ok(StreamChunk::ToolCallDelta {
                id: "tc_1".to_string(),
                fragment: "{}".to_string(),
            }),
            Ok(StreamChunk::ToolCallEnd {
                id: "tc_1".to_string(),
            }),
            Ok(StreamChunk::Done {
                stop_reason: None,
            }),
        ])))
    }
}

/// Closes its stream immediately, without a `Done` chunk, when the token is
/// already cancelled, the way the HTTP-backed providers behave.
struct QuitsOnCancelProvider;

#[async_trait]
impl ChatProvider for QuitsOnCancelProvider {
    fn id(&self) -> &'static str {
        "quits-on-cancel"
    }

    async fn stream_completion(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _system_prompt: &str,
        cancel: CancellationToken,
    ) -> LlmResult<ChunkStream> {
        if cancel.is_cancelled() {
            return Ok(Box::pin(stream::empty::<LlmResult<StreamChunk>>()));
        }
        Ok(Box::pin(stream::iter(vec![Ok(StreamChunk::Done {
            stop_reason: None,
        })])))
    }
}

fn orchestrator(max_rounds: usize) -> AgentOrchestrator {
    AgentOrchestrator::new(ToolRegistry::with_builtin_tools(None), max_rounds)
}

fn sink() -> (UpdateSink, UnboundedReceiver<AgentUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UpdateSink::unbound(tx), rx)
}

fn drain(rx: &mut UnboundedReceiver<AgentUpdate>) -> Vec<AgentUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn count_stream_complete(updates: &[AgentUpdate]) -> usize {
    updates
        .iter()
        .filter(|u| matches!(u, AgentUpdate::StreamComplete))
        .count()
}

#[tokio::test]
async fn accumulates_interleaved_fragments_into_one_assistant_message() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(StreamChunk::Text("Hi ".to_string())),
        Ok(StreamChunk::ToolCallStart {
            id: "1".to_string(),
            name: "x".to_string(),
        }),
        Ok(StreamChunk::ToolCallDelta {
            id: "1".to_string(),
            fragment: "{\"a\":".to_string(),
        }),
        Ok(StreamChunk::ToolCallDelta {
            id: "1".to_string(),
            fragment: "1}".to_string(),
        }),
        Ok(StreamChunk::ToolCallEnd {
            id: "1".to_string(),
        }),
        Ok(StreamChunk::Done {
            stop_reason: Some("tool_use".to_string()),
        }),
    ]]);

    let mut state = StateManager::new();
    let mut transcript = Vec::new();
    let (sink, mut rx) = sink();

    let outcome = orchestrator(10)
        .process_message(
            provider,
            &mut state,
            &mut transcript,
            "hello",
            &sink,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome, TurnOutcome::Completed);

    let assistant = &transcript[1];
    assert_eq!(assistant.content.as_deref(), Some("Hi "));
    assert_eq!(assistant.tool_calls.len(), 1);
    assert_eq!(assistant.tool_calls[0].name, "x");
    let args: serde_json::Value =
        serde_json::from_str(&assistant.tool_calls[0].arguments_json).unwrap();
    assert_eq!(args, serde_json::json!({ "a": 1 }));

    // Unknown tool comes back as a failed tool result, not an error event.
    let updates = drain(&mut rx);
    assert_eq!(count_stream_complete(&updates), 1);
    assert!(matches!(updates.last(), Some(AgentUpdate::StreamComplete)));
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, AgentUpdate::Error { .. }))
    );
    assert!(transcript[2].content.as_deref().unwrap().contains("Unknown tool 'x'"));
}

#[tokio::test]
async fn round_cap_truncates_gracefully() {
    let mut state = StateManager::new();
    let mut transcript = Vec::new();
    let (sink, mut rx) = sink();

    let outcome = orchestrator(3)
        .process_message(
            Arc::new(RelentlessProvider),
            &mut state,
            &mut transcript,
            "loop forever",
            &sink,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome, TurnOutcome::Completed);

    let assistant_rounds = transcript
        .iter()
        .filter(|m| m.role == llm::Role::Assistant)
        .count();
    assert_eq!(assistant_rounds, 3);

    let updates = drain(&mut rx);
    assert_eq!(count_stream_complete(&updates), 1);
    assert!(matches!(updates.last(), Some(AgentUpdate::StreamComplete)));
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, AgentUpdate::Error { .. }))
    );
}

#[tokio::test]
async fn ask_user_ends_the_turn_after_the_batch() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(StreamChunk::ToolCallStart {
            id: "tc_1".to_string(),
            name: "create_comment".to_string(),
        }),
        Ok(StreamChunk::ToolCallDelta {
            id: "tc_1".to_string(),
            fragment: "{\"text\":\"Jump logic\"}".to_string(),
        }),
        Ok(StreamChunk::ToolCallEnd {
            id: "tc_1".to_string(),
        }),
        Ok(StreamChunk::ToolCallStart {
            id: "tc_2".to_string(),
            name: "ask_user".to_string(),
        }),
        Ok(StreamChunk::ToolCallDelta {
            id: "tc_2".to_string(),
            fragment: "{\"question\":\"Which key triggers the jump?\"}".to_string(),
        }),
        Ok(StreamChunk::ToolCallEnd {
            id: "tc_2".to_string(),
        }),
        Ok(StreamChunk::Done { stop_reason: None }),
    ]]);

    let mut state = StateManager::new();
    let mut transcript = Vec::new();
    let (sink, mut rx) = sink();

    let outcome = orchestrator(10)
        .process_message(
            provider,
            &mut state,
            &mut transcript,
            "make a jump",
            &sink,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome, TurnOutcome::Completed);

    // The comment landed before the turn ended.
    assert_eq!(state.graph().comments.len(), 1);

    let updates = drain(&mut rx);
    assert!(
        updates
            .iter()
            .any(|u| matches!(u, AgentUpdate::GraphDelta { .. }))
    );
    assert!(updates.iter().any(|u| matches!(
        u,
        AgentUpdate::AskUser { question } if question == "Which key triggers the jump?"
    )));
    assert_eq!(count_stream_complete(&updates), 1);
    assert!(matches!(updates.last(), Some(AgentUpdate::StreamComplete)));

    // No second model round after the question.
    let assistant_rounds = transcript
        .iter()
        .filter(|m| m.role == llm::Role::Assistant)
        .count();
    assert_eq!(assistant_rounds, 1);
}

#[tokio::test]
async fn transport_failure_surfaces_error_then_stream_complete() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(StreamChunk::Text("par".to_string())),
        Err("connection reset".to_string()),
    ]]);

    let mut state = StateManager::new();
    let mut transcript = Vec::new();
    let (sink, mut rx) = sink();

    let outcome = orchestrator(10)
        .process_message(
            provider,
            &mut state,
            &mut transcript,
            "hello",
            &sink,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outcome, TurnOutcome::Completed);

    let updates = drain(&mut rx);
    let tail: Vec<&AgentUpdate> = updates.iter().rev().take(2).collect();
    assert!(matches!(tail[0], AgentUpdate::StreamComplete));
    assert!(matches!(
        tail[1],
        AgentUpdate::Error { message } if message.contains("connection reset")
    ));
    assert_eq!(count_stream_complete(&updates), 1);
}

#[tokio::test]
async fn cancellation_suppresses_stream_complete() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(StreamChunk::Text("never shown".to_string())),
        Ok(StreamChunk::Done { stop_reason: None }),
    ]]);

    let mut state = StateManager::new();
    let mut transcript = Vec::new();
    let (sink, mut rx) = sink();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator(10)
        .process_message(
            provider,
            &mut state,
            &mut transcript,
            "hello",
            &sink,
            &cancel,
        )
        .await;
    assert_eq!(outcome, TurnOutcome::Cancelled);

    let updates = drain(&mut rx);
    assert_eq!(count_stream_complete(&updates), 0);
    assert!(
        !updates
            .iter()
            .any(|u| matches!(u, AgentUpdate::Error { .. }))
    );
}

#[tokio::test]
async fn cancelled_stream_ending_without_done_is_reported_cancelled() {
    let mut state = StateManager::new();
    let mut transcript = Vec::new();
    let (sink, mut rx) = sink();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator(10)
        .process_message(
            Arc::new(QuitsOnCancelProvider),
            &mut state,
            &mut transcript,
            "hello",
            &sink,
            &cancel,
        )
        .await;
    assert_eq!(outcome, TurnOutcome::Cancelled);

    // No assistant message and no completion signal for the dead turn.
    assert_eq!(transcript.len(), 1);
    let updates = drain(&mut rx);
    assert_eq!(count_stream_complete(&updates), 0);
}
