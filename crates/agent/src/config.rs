//! Env-driven service configuration.

use crate::DEFAULT_MAX_ROUNDS;
use llm::{
    AnthropicProvider, AnthropicSettings, LlmResult, OllamaProvider, OllamaSettings,
    OpenAiProvider, OpenAiSettings, ProviderRegistry,
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_provider: String,
    pub max_rounds: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_provider: "anthropic".to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(provider) = std::env::var("AGENT_DEFAULT_PROVIDER") {
            config.default_provider = provider;
        }
        if let Ok(rounds) = std::env::var("AGENT_MAX_ROUNDS") {
            if let Ok(rounds) = rounds.parse() {
                config.max_rounds = rounds;
            }
        }
        config
    }
}

/// Build the provider registry from the environment. Keyed backends are
/// registered only when their API key is present; Ollama needs no key and
/// is always available as a local fallback.
pub fn providers_from_env() -> LlmResult<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    let anthropic = AnthropicSettings::from_env();
    if !anthropic.api_key.is_empty() {
        registry.register(Arc::new(AnthropicProvider::new(anthropic)?));
    }
    let openai = OpenAiSettings::from_env();
    if !openai.api_key.is_empty() {
        registry.register(Arc::new(OpenAiProvider::new(openai)?));
    }
    registry.register(Arc::new(OllamaProvider::new(OllamaSettings::from_env())?));

    info!(providers = ?registry.ids(), "configured chat providers");
    Ok(registry)
}
