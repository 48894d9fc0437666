//! Error types for market data operations

use thiserror::Error;

/// Market data specific errors
#[derive(Debug, Error)]
pub enum MarketError {
    /// Upstream answered with a non-success status
    #[error("{0}")]
    Api(String),

    /// Catalog id is empty or not usable in a request path
    #[error("Invalid catalog id: '{0}'")]
    InvalidCatalogId(String),

    /// Range label not in the supported set
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Payload did not have the expected shape
    #[error("Malformed market data: {0}")]
    MalformedPayload(String),

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

/// Result type alias for market operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Convert MarketError to desk_core::Error
impl From<MarketError> for desk_core::Error {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Api(_) | MarketError::Network(_) => Self::Transport(err.to_string()),
            MarketError::MalformedPayload(_) | MarketError::Json(_) => {
                Self::Protocol(err.to_string())
            },
            MarketError::InvalidCatalogId(_) | MarketError::InvalidRange(_) => {
                Self::Precondition(err.to_string())
            },
            MarketError::Config(msg) => Self::Config(msg),
        }
    }
}

impl From<desk_utils::ConfigError> for MarketError {
    fn from(err: desk_utils::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarketError::Api("Failed to fetch market data (HTTP 429)".to_string());
        assert_eq!(err.to_string(), "Failed to fetch market data (HTTP 429)");

        let err = MarketError::MalformedPayload("missing prices".to_string());
        assert_eq!(err.to_string(), "Malformed market data: missing prices");
    }

    #[test]
    fn test_error_conversion() {
        let core: desk_core::Error = MarketError::Api("down".to_string()).into();
        assert!(core.is_retryable());

        let core: desk_core::Error = MarketError::MalformedPayload("bad".to_string()).into();
        assert!(matches!(core, desk_core::Error::Protocol(_)));

        let core: desk_core::Error = MarketError::InvalidCatalogId(String::new()).into();
        assert!(matches!(core, desk_core::Error::Precondition(_)));
    }
}
