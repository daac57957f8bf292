use thiserror::Error;

/// Errors surfaced by provider adapters. All of these are per-turn
/// recoverable: they end the current completion, never the session.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} api error (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("stream error: {0}")]
    Stream(String),
}

pub type LlmResult<T> = Result<T, LlmError>;
