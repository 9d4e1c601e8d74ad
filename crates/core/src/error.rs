//! Error types for Recall.
//!
//! A single error enum covers every failure category the knowledge store and
//! its host process can report: configuration, I/O, embedding, persistence,
//! and serialization.

use thiserror::Error;

/// Unified error type for Recall.
///
/// No error is fatal to the process. Every failure is scoped to the single
/// user operation that produced it and is returned to the caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedder unreachable or returned malformed output
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Knowledge base usage errors (invalid arguments, dimension mismatches)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Blob store read/write failures
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error came from the embedding capability.
    pub fn is_embedding(&self) -> bool {
        matches!(self, AppError::Embedding(_))
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
