//! Pipeline model error types.

use thiserror::Error;

use crate::collection::CollectionId;
use crate::transform::TransformId;

/// Result type for pipeline model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or querying a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A collection id does not belong to this pipeline.
    #[error("unknown collection: {0}")]
    UnknownCollection(CollectionId),

    /// A transform id does not belong to this pipeline.
    #[error("unknown transform: {0}")]
    UnknownTransform(TransformId),

    /// A composite was closed while none was open.
    #[error("no composite transform is currently open")]
    NoOpenComposite,

    /// Pipeline options failed validation.
    #[error("invalid pipeline options: {0}")]
    InvalidOptions(String),

    /// A pipeline's transform hierarchy or wiring is inconsistent.
    #[error("malformed pipeline: {0}")]
    Malformed(String),

    /// A transform was applied with inputs it cannot accept.
    #[error("invalid input for {transform}: {message}")]
    InvalidInput {
        /// Name of the transform being applied.
        transform: String,
        /// Error message.
        message: String,
    },
}
