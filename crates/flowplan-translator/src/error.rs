//! Translation error types.

use flowplan_model::ModelError;
use thiserror::Error;

/// Result type for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Errors that abort a translation.
///
/// Every error is terminal: no partial job is returned.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// A composite exposes an output that no transform produces.
    #[error("binding error in {transform}: {message}")]
    Binding {
        /// Full name of the composite.
        transform: String,
        /// Error message.
        message: String,
    },

    /// A transform, coder, restriction or option has a shape the compiler
    /// cannot translate.
    #[error("unsupported shape: {0}")]
    UnsupportedShape(String),

    /// An internal consistency check failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Two steps share a name and unique names are enforced.
    #[error("duplicate step name: {0}")]
    DuplicateName(String),

    /// Pipeline options are invalid.
    #[error("invalid pipeline options: {0}")]
    InvalidOptions(String),

    /// The pipeline model is inconsistent.
    #[error("pipeline model error: {0}")]
    Model(#[from] ModelError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An encoded payload is not valid base64.
    #[error("payload decoding error: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl TranslateError {
    /// Creates an unsupported-shape error.
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedShape(message.into())
    }

    /// Creates an invariant violation.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}
