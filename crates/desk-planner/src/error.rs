//! Error types for planner operations

use thiserror::Error;

/// Planner specific errors
#[derive(Debug, Error)]
pub enum PlanError {
    /// Rejected locally, no stream was opened
    #[error("Goal must not be empty")]
    EmptyGoal,

    /// The planner reported an error event
    #[error("Planner failed: {0}")]
    Server(String),

    /// Backend answered with a non-success status
    #[error("{0}")]
    Api(String),

    /// A stream payload could not be interpreted
    #[error("Malformed plan event: {0}")]
    Malformed(String),

    /// The stream closed before a final event arrived
    #[error("Planner stream ended without a final answer")]
    Incomplete,

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint could not be built
    #[error("Invalid planner URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for planner operations
pub type Result<T> = std::result::Result<T, PlanError>;

/// Convert PlanError to desk_core::Error
impl From<PlanError> for desk_core::Error {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::EmptyGoal => Self::Precondition(err.to_string()),
            PlanError::Api(_) | PlanError::Network(_) | PlanError::Incomplete => Self::Transport(err.to_string()),
            PlanError::Malformed(_) | PlanError::Json(_) => Self::Protocol(err.to_string()),
            PlanError::Server(_) => Self::Generic(err.to_string()),
            PlanError::Url(e) => Self::Config(e.to_string()),
            PlanError::Config(msg) => Self::Config(msg),
        }
    }
}

impl From<desk_utils::ConfigError> for PlanError {
    fn from(err: desk_utils::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(PlanError::Server("no tools".into()).to_string(), "Planner failed: no tools");
        assert_eq!(PlanError::EmptyGoal.to_string(), "Goal must not be empty");
    }

    #[test]
    fn test_error_conversion() {
        let core: desk_core::Error = PlanError::EmptyGoal.into();
        assert!(matches!(core, desk_core::Error::Precondition(_)));

        let core: desk_core::Error = PlanError::Incomplete.into();
        assert!(core.is_retryable());

        let core: desk_core::Error = PlanError::Malformed("{".into()).into();
        assert!(matches!(core, desk_core::Error::Protocol(_)));
    }
}
