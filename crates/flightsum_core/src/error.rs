//! Error kinds surfaced by the summarization pipeline.
//!
//! Division by zero is never reported here: the two guarded denominators
//! (satisfying count and coverage) are defined to yield 0.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("cannot read or write {}: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode JSON summary {}: {source}", path.display())]
    JsonDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode JSON summary: {0}")]
    JsonEncode(#[source] serde_json::Error),

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid vocabulary: {0}")]
    Vocabulary(String),

    #[error("term `{0}` is not of the form <attribute>.<modality>")]
    InvalidTerm(String),

    /// A worker failed or panicked; the whole run is aborted.
    #[error("worker for batch {batch} failed: {reason}")]
    WorkerFailure { batch: usize, reason: String },

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}

impl SummaryError {
    /// Maps an I/O error on `path` onto `FileNotFound` or `FileUnreadable`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            SummaryError::FileNotFound { path }
        } else {
            SummaryError::FileUnreadable { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, SummaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_classified() {
        let err = SummaryError::from_io(
            "missing.csv",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SummaryError::FileNotFound { .. }));

        let err = SummaryError::from_io(
            "locked.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, SummaryError::FileUnreadable { .. }));
    }
}
