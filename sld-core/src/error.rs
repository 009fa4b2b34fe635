//! Error types for diagram editing operations.

use thiserror::Error;

/// Result type for diagram editing operations.
pub type SldResult<T> = Result<T, SldError>;

/// Errors that can occur while editing a diagram document.
///
/// Infeasible geometry and ambiguous topology are *not* errors: validators
/// return `false` and graph operations return empty edit lists for those.
/// These variants cover genuinely broken requests from the host.
#[derive(Debug, Error)]
pub enum SldError {
    /// Node not found in the document.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// An edit referenced a parent or reference node that does not exist.
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
