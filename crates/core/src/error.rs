//! Error types for govbrief.
//!
//! A single error enum covers the request-level taxonomy (validation,
//! degraded upstreams, schema failures, cancellation) as well as the
//! infrastructural failures of configuration, I/O and the collaborators.

use thiserror::Error;

/// Unified error type for govbrief.
///
/// All library functions return `Result<T, AppError>`.
/// Errors are represented and propagated, never panicked on.
#[derive(Error, Debug)]
pub enum AppError {
    /// Empty or malformed query; rejected before any stream is opened
    #[error("Validation error: {0}")]
    Validation(String),

    /// Retrieval or provider timeout that persisted after retry
    #[error("Upstream degraded: {0}")]
    UpstreamDegraded(String),

    /// Structured output could not be decoded into a decision report
    #[error("Schema error: {0}")]
    Schema(String),

    /// The caller went away; never surfaced as a frame
    #[error("Request cancelled by caller")]
    Cancelled,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document store and enrichment errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error should end the request silently.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
