//! Error types for desk-core

use thiserror::Error;

/// Result type alias for desk-core
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by all subsystems
///
/// Subsystem errors convert into this type at their crate boundary. Every
/// variant carries a short, human-readable message suitable for a panel's
/// error line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Rejected locally before any network call
    #[error("{0}")]
    Precondition(String),

    /// A symbol could not be mapped to a catalog id
    #[error("Unresolvable reference: {0}")]
    Unresolvable(String),

    /// Transport or HTTP-status level failure
    #[error("{0}")]
    Transport(String),

    /// The remote side sent something we could not interpret
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Whether offering the user a retry makes sense.
    ///
    /// Nothing is ever retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
