//! # Hub Import Errors

use thiserror::Error;

use crate::records::RecordError;

/// Result type for hub import operations
pub type HubResult<T> = Result<T, HubError>;

/// Hub import errors
#[derive(Debug, Error)]
pub enum HubError {
    #[error("it's not possible to import records to a non published dataset")]
    DatasetNotReady,

    #[error("hub dataset has no column named '{0}'")]
    MissingColumn(String),

    #[error("line {line}: invalid row: {reason}")]
    InvalidRow { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Records(#[from] RecordError),
}

impl HubError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            HubError::DatasetNotReady => 422,
            HubError::MissingColumn(_) => 422,
            HubError::InvalidRow { .. } => 400,
            HubError::Io(_) => 500,
            HubError::Records(err) => err.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_errors_keep_their_status() {
        let err = HubError::from(RecordError::unprocessable("bad record"));
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.to_string(), "bad record");

        let err = HubError::from(RecordError::Store("down".into()));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_missing_column_message() {
        let err = HubError::MissingColumn("review".into());
        assert_eq!(err.to_string(), "hub dataset has no column named 'review'");
    }
}
