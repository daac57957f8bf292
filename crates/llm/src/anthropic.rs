//! Anthropic messages-API provider.

use crate::{
    ChatMessage, ChatProvider, ChunkStream, LlmError, LlmResult, Role, SseLineDecoder,
    StreamChunk, ToolDefinition,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }
}

impl AnthropicSettings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            settings.api_key = key;
        }
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            settings.model = model;
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            settings.base_url = url;
        }
        settings
    }
}

pub struct AnthropicProvider {
    client: Client,
    settings: AnthropicSettings,
}

impl AnthropicProvider {
    pub fn new(settings: AnthropicSettings) -> LlmResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self { client, settings })
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(key) = self.settings.api_key.parse() {
            headers.insert("x-api-key", key);
        }
        if let Ok(version) = ANTHROPIC_VERSION.parse() {
            headers.insert("anthropic-version", version);
        }
        headers
    }

    /// Convert the canonical transcript to Anthropic message shape: tool
    /// results become user-role `tool_result` blocks, assistant tool calls
    /// become `tool_use` blocks.
    fn convert_messages(messages: &[ChatMessage]) -> Vec<AnthropicMessage> {
        let mut converted = Vec::new();
        for msg in messages {
            match msg.role {
                Role::User => converted.push(AnthropicMessage {
                    role: "user",
                    content: AnthropicContent::Text(msg.text().to_string()),
                }),
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if let Some(text) = &msg.content {
                        if !text.is_empty() {
                            blocks.push(AnthropicBlock::Text { text: text.clone() });
                        }
                    }
                    for call in &msg.tool_calls {
                        blocks.push(AnthropicBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: serde_json::from_str(&call.arguments_json)
                                .unwrap_or_else(|_| serde_json::json!({})),
                        });
                    }
                    converted.push(AnthropicMessage {
                        role: "assistant",
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::Tool => converted.push(AnthropicMessage {
                    role: "user",
                    content: AnthropicContent::Blocks(vec![AnthropicBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.text().to_string(),
                    }]),
                }),
            }
        }
        converted
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn id(&self) -> &'static str {
        "anthropic"
    }

    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system_prompt: &str,
        cancel: CancellationToken,
    ) -> LlmResult<ChunkStream> {
        let request = AnthropicRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            system: system_prompt.to_string(),
            messages: Self::convert_messages(messages),
            stream: true,
            tools: if tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(tools))
            },
        };

        let url = format!("{}/messages", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "anthropic",
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(event_stream(response.bytes_stream(), cancel))
    }
}

/// Decode a messages-API SSE body into the canonical chunk sequence. Each
/// read races the cancellation token, so a stalled connection still winds
/// down promptly.
fn event_stream<S, B, E>(bytes: S, cancel: CancellationToken) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    let mut bytes = Box::pin(bytes);
    Box::pin(try_stream! {
        let mut decoder = SseLineDecoder::new();
        let mut current_tool: Option<String> = None;
        while let Some(Some(read)) = cancel.run_until_cancelled(bytes.next()).await {
            let read = read.map_err(Into::<LlmError>::into)?;
            for data in decoder.feed(read.as_ref()) {
                if data == "[DONE]" {
                    return;
                }
                for chunk in decode_data(&data, &mut current_tool)? {
                    yield chunk;
                }
            }
        }
    })
}

/// Decode one SSE payload into zero or more canonical chunks. Malformed
/// payloads decode to nothing; an explicit `error` event is terminal.
fn decode_data(data: &str, current_tool: &mut Option<String>) -> LlmResult<Vec<StreamChunk>> {
    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "skipping malformed anthropic event");
            return Ok(Vec::new());
        }
    };

    let chunks = match event.event_type.as_str() {
        "content_block_start" => match event.content_block {
            Some(block) if block.block_type == "tool_use" => {
                let id = block.id.unwrap_or_default();
                let name = block.name.unwrap_or_default();
                *current_tool = Some(id.clone());
                vec![StreamChunk::ToolCallStart { id, name }]
            }
            _ => Vec::new(),
        },
        "content_block_delta" => match event.delta {
            Some(delta) if delta.delta_type == "text_delta" => delta
                .text
                .map(StreamChunk::Text)
                .into_iter()
                .collect(),
            Some(delta) if delta.delta_type == "input_json_delta" => {
                match (current_tool.as_ref(), delta.partial_json) {
                    (Some(id), Some(fragment)) => vec![StreamChunk::ToolCallDelta {
                        id: id.clone(),
                        fragment,
                    }],
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        },
        "content_block_stop" => match current_tool.take() {
            Some(id) => vec![StreamChunk::ToolCallEnd { id }],
            None => Vec::new(),
        },
        "message_stop" => vec![StreamChunk::Done {
            stop_reason: Some("end_turn".to_string()),
        }],
        "error" => {
            let message = event
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown stream error".to_string());
            return Err(LlmError::Stream(message));
        }
        _ => Vec::new(),
    };
    Ok(chunks)
}

// Anthropic wire types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    content_block: Option<StreamContentBlock>,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_tool_results_to_user_blocks() {
        let messages = vec![
            ChatMessage::user("hello"),
            ChatMessage::assistant(
                Some("working".to_string()),
                vec![ToolCall::new("tc_1", "create_node", r#"{"title":"X"}"#)],
            ),
            ChatMessage::tool_result("tc_1", "create_node", "Created node"),
        ];

        let converted = AnthropicProvider::convert_messages(&messages);
        let json = serde_json::to_value(&converted).unwrap();

        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["content"], "hello");
        assert_eq!(json[1]["role"], "assistant");
        assert_eq!(json[1]["content"][0]["type"], "text");
        assert_eq!(json[1]["content"][1]["type"], "tool_use");
        assert_eq!(json[1]["content"][1]["input"]["title"], "X");
        assert_eq!(json[2]["role"], "user");
        assert_eq!(json[2]["content"][0]["type"], "tool_result");
        assert_eq!(json[2]["content"][0]["tool_use_id"], "tc_1");
    }

    #[test]
    fn decodes_tool_use_block_sequence() {
        let mut current = None;
        let start = decode_data(
            r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"tc_9","name":"connect_pins"}}"#,
            &mut current,
        )
        .unwrap();
        assert_eq!(
            start,
            vec![StreamChunk::ToolCallStart {
                id: "tc_9".to_string(),
                name: "connect_pins".to_string()
            }]
        );

        let delta = decode_data(
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"a\":"}}"#,
            &mut current,
        )
        .unwrap();
        assert_eq!(
            delta,
            vec![StreamChunk::ToolCallDelta {
                id: "tc_9".to_string(),
                fragment: "{\"a\":".to_string()
            }]
        );

        let stop = decode_data(r#"{"type":"content_block_stop","index":1}"#, &mut current).unwrap();
        assert_eq!(
            stop,
            vec![StreamChunk::ToolCallEnd {
                id: "tc_9".to_string()
            }]
        );
        assert!(current.is_none());
    }

    #[test]
    fn malformed_payload_is_skipped_silently() {
        let mut current = None;
        assert!(decode_data("{not json", &mut current).unwrap().is_empty());
    }

    #[test]
    fn message_stop_maps_to_done() {
        let mut current = None;
        let chunks = decode_data(r#"{"type":"message_stop"}"#, &mut current).unwrap();
        assert_eq!(
            chunks,
            vec![StreamChunk::Done {
                stop_reason: Some("end_turn".to_string())
            }]
        );
    }

    #[test]
    fn error_event_is_terminal() {
        let mut current = None;
        let result = decode_data(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"busy"}}"#,
            &mut current,
        );
        assert!(matches!(result, Err(LlmError::Stream(m)) if m == "busy"));
    }

    #[tokio::test]
    async fn streams_chunks_until_the_body_ends() {
        let body = futures::stream::iter(vec![
            Ok::<_, LlmError>(
                b"data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n"
                    .to_vec(),
            ),
            Ok(b"data: {\"type\":\"message_stop\"}\n".to_vec()),
        ]);
        let chunks: Vec<_> = event_stream(body, CancellationToken::new()).collect().await;

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
        let mut chunks = event_stream(body, cancel);
        assert!(chunks.next().await.is_none());
    }
}
