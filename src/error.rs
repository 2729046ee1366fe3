//! Error types for CodeAce

use thiserror::Error;

/// Result type alias using CodeAce's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CodeAce
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model or search provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// The model asked for a tool that is not registered
    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    /// The agent/tool cycle ran past its hop budget
    #[error("Agent exceeded the maximum of {0} model turns")]
    MaxHopsExceeded(u32),

    /// The caller cancelled an in-flight turn
    #[error("Turn cancelled")]
    Cancelled,

    /// A turn is already running for this session
    #[error("Session busy: {0}")]
    Busy(String),

    /// Checkpoint store error
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Installer error
    #[error("Install error: {0}")]
    Install(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::RateLimit(_) | Error::Timeout(_) | Error::Database(_)
        )
    }
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::InvalidInput(format!("Prompt failed: {}", err))
    }
}
