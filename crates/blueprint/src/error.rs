use thiserror::Error;

/// Errors raised by [`crate::StateManager`] operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("comment '{0}' not found")]
    CommentNotFound(String),

    #[error("variable '{0}' not found")]
    VariableNotFound(String),

    #[error("pin '{pin}' not found on node '{node}'")]
    PinNotFound { node: String, pin: String },

    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type StateResult<T> = Result<T, StateError>;
