//! Engine error types.
//!
//! Nothing here is fatal by design: a malformed element degrades to an
//! absent render object, a failed asset load degrades to a placeholder, and
//! the canvas never enters an unrecoverable state from a single bad input.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed element rejected at render-object creation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Element has no live render object.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Asset fetch failed (network or protocol error).
    #[error("Failed to load asset {url}: {reason}")]
    AssetLoad {
        /// The asset URL that failed.
        url: String,
        /// Failure description.
        reason: String,
    },

    /// Asset fetch exceeded the per-URL timeout.
    #[error("Asset load timed out: {0}")]
    AssetTimeout(String),

    /// Fetched bytes could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Error bubbled up from the core model.
    #[error(transparent)]
    Core(#[from] pin_core::CoreError),
}
