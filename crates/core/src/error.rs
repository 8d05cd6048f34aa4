//! Error types for the grounding subsystem.
//!
//! One enum covers every failure category: configuration, I/O, the three
//! external collaborators (embedding provider, vector store, document
//! catalog), and serialization.

use thiserror::Error;

/// Unified error type.
///
/// Collaborator failures (`EmbeddingProvider`, `VectorStore`,
/// `CatalogLookup`) are recoverable: callers degrade or retry. `Config`
/// errors are fatal and must be reported immediately.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (missing namespace, dimension mismatch, bad files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport, timeout, or rate-limit failure from the embedding provider
    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// Query, upsert, or delete failure in the vector store
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Relational document catalog unavailable or query failed
    #[error("Catalog lookup error: {0}")]
    CatalogLookup(String),

    /// Knowledge base errors (parsing, chunking, bad input)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error must abort the operation instead of being
    /// retried, degraded, or counted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
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
