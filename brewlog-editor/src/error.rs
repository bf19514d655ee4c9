//! Error types for brewlog-editor
//!
//! Structural errors (`NotFound`, `InvalidScaleFactor`, `InvalidInput`) are
//! raised before anything is mutated. Transient errors (`CatalogUnavailable`,
//! `MetricsUnavailable`, `PersistenceFailed`, `ExportFailed`) leave the last
//! good state in place; the caller retries by re-issuing the operation.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the recipe editor
///
/// Clone so a single settled outcome can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    /// Mutation targets an addition that is not in the ingredient list
    #[error("Ingredient addition not found: {0}")]
    NotFound(Uuid),

    /// Save preconditions unmet
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Ingredient catalog could not be fetched
    #[error("Ingredient catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Recompute failed; previous metrics retained
    #[error("Metrics unavailable: {0}")]
    MetricsUnavailable(String),

    /// Scale factor was zero, negative or not finite
    #[error("Invalid scale factor: {0}")]
    InvalidScaleFactor(f64),

    /// Persistence collaborator failed
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// Export collaborator failed
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// Malformed mutation request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Editing session has been torn down
    #[error("Editing session closed")]
    SessionClosed,
}

impl EditorError {
    /// Whether retrying the same operation later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EditorError::CatalogUnavailable(_)
                | EditorError::MetricsUnavailable(_)
                | EditorError::PersistenceFailed(_)
                | EditorError::ExportFailed(_)
        )
    }
}

/// Convenience Result type using EditorError
pub type Result<T> = std::result::Result<T, EditorError>;
