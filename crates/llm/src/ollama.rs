//! Local Ollama provider. Ollama exposes an OpenAI-compatible
//! chat-completions endpoint, so this adapter only swaps the base URL and
//! drops the auth header.

use crate::openai::{ChatCompletionsRequest, chat_completions_stream};
use crate::{ChatMessage, ChatProvider, ChunkStream, LlmError, LlmResult, ToolDefinition};
use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3";

#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl OllamaSettings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            settings.base_url = url;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            settings.model = model;
        }
        settings
    }
}

pub struct OllamaProvider {
    client: Client,
    settings: OllamaSettings,
}

impl OllamaProvider {
    pub fn new(settings: OllamaSettings) -> LlmResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn id(&self) -> &'static str {
        "ollama"
    }

    async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system_prompt: &str,
        cancel: CancellationToken,
    ) -> LlmResult<ChunkStream> {
        let request =
            ChatCompletionsRequest::new(&self.settings.model, messages, tools, system_prompt);
        let url = format!("{}/v1/chat/completions", self.settings.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "ollama",
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(chat_completions_stream(response.bytes_stream(), cancel))
    }
}
