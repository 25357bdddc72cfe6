//! # Record Errors

use thiserror::Error;

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Record validation and record store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record mutation is not acceptable for the target dataset
    #[error("{0}")]
    UnprocessableEntity(String),

    /// Failure raised by the record store collaborator
    #[error("record store error: {0}")]
    Store(String),
}

impl RecordError {
    /// Create an unprocessable entity error
    pub fn unprocessable(message: impl Into<String>) -> Self {
        RecordError::UnprocessableEntity(message.into())
    }

    /// Wrap a validation failure with the position of the failing bulk item.
    ///
    /// Store failures are passed through untouched.
    pub fn at_position(self, idx: usize) -> Self {
        match self {
            RecordError::UnprocessableEntity(msg) => RecordError::UnprocessableEntity(format!(
                "record at position {} is not valid because {}",
                idx, msg
            )),
            other => other,
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            RecordError::UnprocessableEntity(_) => 422,
            RecordError::Store(_) => 500,
        }
    }
}
