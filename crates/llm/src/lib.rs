//! Multi-provider streaming chat abstraction.
//!
//! Three wire protocols (Anthropic messages, OpenAI chat completions, and
//! Ollama's OpenAI-compatible endpoint) are normalized into one canonical
//! [`StreamChunk`] sequence behind the [`ChatProvider`] trait, selected at
//! runtime through a [`ProviderRegistry`] name lookup.
//!
//! # Example
//!
//! ```ignore
//! use llm::{AnthropicProvider, AnthropicSettings, ChatMessage, ChatProvider};
//!
//! let provider = AnthropicProvider::new(AnthropicSettings::from_env())?;
//! let messages = vec![ChatMessage::user("Hello!")];
//! let mut stream = provider
//!     .stream_completion(&messages, &[], "You are helpful.", cancel)
//!     .await?;
//! ```

mod anthropic;
mod error;
mod message;
mod ollama;
mod openai;
mod provider;
mod registry;
mod sse;

pub use anthropic::*;
pub use error::*;
pub use message::*;
pub use ollama::*;
pub use openai::*;
pub use provider::*;
pub use registry::*;
pub use sse::*;
