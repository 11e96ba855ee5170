//! Error types for model operations.

use thiserror::Error;

/// Result type for model operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in model operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Element not found in the scene model.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Malformed element data. The element stays in the model but is not
    /// rendered.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
