use thiserror::Error;

/// Errors surfaced by tool handlers and session plumbing. Handler errors
/// never escape the executor boundary; they become failed tool results.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    State(#[from] blueprint::StateError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
