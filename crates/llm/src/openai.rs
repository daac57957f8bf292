//! OpenAI chat-completions provider, plus the wire plumbing shared with
//! every other chat-completions-compatible backend.

use crate::{
    ChatMessage, ChatProvider, ChunkStream, LlmError, LlmResult, Role, SseLineDecoder,
    StreamChunk, ToolDefinition,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }
}

impl OpenAiSettings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            settings.api_key = key;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            settings.model = model;
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            settings.base_url = url;
        }
        settings
    }
}

pub struct OpenAiProvider {
    client: Client,
    settings: OpenAiSettings,
}

impl OpenAiProvider {
    pub fn new(settings: OpenAiSettings) -> LlmResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system_prompt: &str,
        cancel: CancellationToken,
    ) -> LlmResult<ChunkStream> {
        let request = ChatCompletionsRequest::new(&self.settings.model, messages, tools, system_prompt);
        let url = format!("{}/chat/completions", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "openai",
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(chat_completions_stream(response.bytes_stream(), cancel))
    }
}

/// Decode a chat-completions SSE body into the canonical chunk sequence.
/// Used by every backend speaking this dialect. Each read races the
/// cancellation token, so a stalled connection still winds down promptly.
pub(crate) fn chat_completions_stream<S, B, E>(bytes: S, cancel: CancellationToken) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    let mut bytes = Box::pin(bytes);
    Box::pin(try_stream! {
        let mut decoder = SseLineDecoder::new();
        let mut state = ChatCompletionsDecoder::default();
        while let Some(Some(read)) = cancel.run_until_cancelled(bytes.next()).await {
            let read = read.map_err(Into::<LlmError>::into)?;
            for data in decoder.feed(read.as_ref()) {
                for chunk in state.decode_data(&data) {
                    yield chunk;
                }
                if state.finished {
                    return;
                }
            }
        }
    })
}

/// Per-response accumulator for the chat-completions dialect. Tool calls
/// arrive index-keyed with the id only on the first fragment; the map
/// remembers id-by-index so later fragments can be attributed, and a
/// `tool_calls` finish reason (or the `[DONE]` sentinel) flushes the calls
/// still pending in index order.
#[derive(Debug, Default)]
pub(crate) struct ChatCompletionsDecoder {
    pending: BTreeMap<u64, String>,
    finished: bool,
}

impl ChatCompletionsDecoder {
    pub(crate) fn decode_data(&mut self, data: &str) -> Vec<StreamChunk> {
        if data == "[DONE]" {
            let mut chunks = self.flush_pending();
            chunks.push(StreamChunk::Done {
                stop_reason: Some("stop".to_string()),
            });
            self.finished = true;
            return chunks;
        }

        let response: StreamResponse = match serde_json::from_str(data) {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "skipping malformed chat-completions line");
                return Vec::new();
            }
        };
        let Some(choice) = response.choices.into_iter().next() else {
            return Vec::new();
        };

        let mut chunks = Vec::new();
        if let Some(delta) = choice.delta {
            if let Some(text) = delta.content {
                if !text.is_empty() {
                    chunks.push(StreamChunk::Text(text));
                }
            }
            for call in delta.tool_calls {
                if let Some(id) = call.id {
                    let name = call
                        .function
                        .as_ref()
                        .and_then(|f| f.name.clone())
                        .unwrap_or_default();
                    self.pending.insert(call.index, id.clone());
                    chunks.push(StreamChunk::ToolCallStart { id, name });
                }
                if let Some(fragment) = call.function.and_then(|f| f.arguments) {
                    if let Some(id) = self.pending.get(&call.index) {
                        chunks.push(StreamChunk::ToolCallDelta {
                            id: id.clone(),
                            fragment,
                        });
                    }
                }
            }
        }
        if choice.finish_reason.as_deref() == Some("tool_calls") {
            chunks.extend(self.flush_pending());
        }
        chunks
    }

    fn flush_pending(&mut self) -> Vec<StreamChunk> {
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|id| StreamChunk::ToolCallEnd { id })
            .collect()
    }
}

// Chat-completions wire types

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

impl ChatCompletionsRequest {
    pub(crate) fn new(
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system_prompt: &str,
    ) -> Self {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system_prompt.is_empty() {
            wire.push(WireMessage {
                role: "system",
                content: Some(system_prompt.to_string()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        for msg in messages {
            wire.push(match msg.role {
                Role::User => WireMessage {
                    role: "user",
                    content: msg.content.clone(),
                    tool_calls: None,
                    tool_call_id: None,
                },
                Role::Assistant => WireMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                    tool_calls: if msg.tool_calls.is_empty() {
                        None
                    } else {
                        Some(
                            msg.tool_calls
                                .iter()
                                .map(|c| WireToolCall {
                                    id: c.id.clone(),
                                    call_type: "function",
                                    function: WireFunction {
                                        name: c.name.clone(),
                                        arguments: c.arguments_json.clone(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: None,
                },
                Role::Tool => WireMessage {
                    role: "tool",
                    content: msg.content.clone(),
                    tool_calls: None,
                    tool_call_id: msg.tool_call_id.clone(),
                },
            });
        }
        Self {
            model: model.to_string(),
            messages: wire,
            stream: true,
            tools: if tools.is_empty() {
                None
            } else {
                Some(
                    tools
                        .iter()
                        .map(|t| WireTool {
                            tool_type: "function",
                            function: WireToolSchema {
                                name: t.name.clone(),
                                description: t.description.clone(),
                                parameters: t.parameters.clone(),
                            },
                        })
                        .collect(),
                )
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireToolSchema,
}

#[derive(Debug, Serialize)]
struct WireToolSchema {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<StreamToolCall>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Debug, Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_puts_system_prompt_first() {
        let messages = vec![ChatMessage::user("make a node")];
        let request = ChatCompletionsRequest::new("gpt-4o", &messages, &[], "You edit graphs.");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "You edit graphs.");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["stream"], true);
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn request_carries_assistant_tool_calls_and_results() {
        let messages = vec![
            ChatMessage::assistant(None, vec![ToolCall::new("tc_1", "delete_node", "{}")]),
            ChatMessage::tool_result("tc_1", "delete_node", "Deleted"),
        ];
        let request = ChatCompletionsRequest::new("gpt-4o", &messages, &[], "");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["messages"][0]["tool_calls"][0]["id"], "tc_1");
        assert_eq!(
            json["messages"][0]["tool_calls"][0]["function"]["name"],
            "delete_node"
        );
        assert_eq!(json["messages"][1]["role"], "tool");
        assert_eq!(json["messages"][1]["tool_call_id"], "tc_1");
    }

    #[test]
    fn decodes_text_deltas() {
        let mut state = ChatCompletionsDecoder::default();
        let chunks =
            state.decode_data(r#"{"choices":[{"delta":{"content":"Hello"}}]}"#);
        assert_eq!(chunks, vec![StreamChunk::Text("Hello".to_string())]);
    }

    #[test]
    fn attributes_argument_fragments_by_index() {
        let mut state = ChatCompletionsDecoder::default();
        let start = state.decode_data(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"tc_1","function":{"name":"create_node","arguments":""}}]}}]}"#,
        );
        assert_eq!(
            start,
            vec![
                StreamChunk::ToolCallStart {
                    id: "tc_1".to_string(),
                    name: "create_node".to_string()
                },
                StreamChunk::ToolCallDelta {
                    id: "tc_1".to_string(),
                    fragment: String::new()
                },
            ]
        );

        let frag = state.decode_data(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"x\":1}"}}]}}]}"#,
        );
        assert_eq!(
            frag,
            vec![StreamChunk::ToolCallDelta {
                id: "tc_1".to_string(),
                fragment: "{\"x\":1}".to_string()
            }]
        );

        let finish = state.decode_data(r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#);
        assert_eq!(
            finish,
            vec![StreamChunk::ToolCallEnd {
                id: "tc_1".to_string()
            }]
        );
    }

    #[test]
    fn done_sentinel_flushes_pending_calls_then_finishes() {
        let mut state = ChatCompletionsDecoder::default();
        state.decode_data(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"tc_1","function":{"name":"get_graph_state"}}]}}]}"#,
        );
        let chunks = state.decode_data("[DONE]");
        assert_eq!(
            chunks,
            vec![
                StreamChunk::ToolCallEnd {
                    id: "tc_1".to_string()
                },
                StreamChunk::Done {
                    stop_reason: Some("stop".to_string())
                },
            ]
        );
        assert!(state.finished);
    }

    #[test]
    fn malformed_line_is_skipped() {
        let mut state = ChatCompletionsDecoder::default();
        assert!(state.decode_data("{broken").is_empty());
        assert!(!state.finished);
    }

    #[tokio::test]
    async fn streams_chunks_until_the_body_ends() {
        let body = futures::stream::iter(vec![
            Ok::<_, LlmError>(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n".to_vec()),
            Ok(b"data: [DONE]\n".to_vec()),
        ]);
        let chunks: Vec<_> = chat_completions_stream(body, CancellationToken::new())
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[0], Ok(StreamChunk::Text(t)) if t == "Hi"));
        assert!(matches!(&chunks[1], Ok(StreamChunk::Done { .. })));
    }

    #[tokio::test]
    async fn cancellation_ends_an_idle_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        // A body that never yields; only the token can end the stream.
        let body = futures::stream::pending::<Result<Vec<u8>, LlmError>>();
        let mut chunks = chat_completions_stream(body, cancel);
        assert!(chunks.next().await.is_none());
    }
}
