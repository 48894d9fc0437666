//! Error types for chat operations

use thiserror::Error;

/// Chat specific errors
#[derive(Debug, Error)]
pub enum ChatError {
    /// Rejected locally before any network call
    #[error("{0}")]
    Precondition(String),

    /// Another send is still in flight for this panel
    #[error("A message is already being sent")]
    Busy,

    /// Backend answered with a non-success status
    #[error("{0}")]
    Api(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Whether the session state was left untouched because of a local rule
    pub fn is_local_rejection(&self) -> bool {
        matches!(self, Self::Precondition(_) | Self::Busy)
    }
}

/// Convert ChatError to desk_core::Error
impl From<ChatError> for desk_core::Error {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Precondition(_) | ChatError::Busy => Self::Precondition(err.to_string()),
            ChatError::Api(_) | ChatError::Network(_) => Self::Transport(err.to_string()),
            ChatError::Json(_) => Self::Protocol(err.to_string()),
            ChatError::Config(msg) => Self::Config(msg),
        }
    }
}

impl From<desk_utils::ConfigError> for ChatError {
    fn from(err: desk_utils::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
