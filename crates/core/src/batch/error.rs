//! Batch processing error types.

use creditship_shared::ErrorCategory;
use creditship_shared::types::{AccountId, BatchJobId};
use thiserror::Error;

use super::types::BatchStatus;
use crate::store::StoreError;

/// Errors returned by batch submission and job queries.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The header lacks required columns. Nothing was staged.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The upload has more rows than one job accepts.
    #[error("batch has {actual} rows, at most {max} allowed")]
    TooManyRows {
        /// Rows in the upload.
        actual: usize,
        /// Configured limit.
        max: usize,
    },

    /// Job does not exist.
    #[error("batch job not found: {0}")]
    NotFound(BatchJobId),

    /// Job belongs to an account outside the actor's scope.
    #[error("batch job {0} is outside your scope")]
    OutOfScope(BatchJobId),

    /// Requested owner filter is outside the actor's scope.
    #[error("account {0} is outside your scope")]
    AccountOutOfScope(AccountId),

    /// The submitting account is deactivated.
    #[error("account {0} is inactive")]
    AccountInactive(AccountId),

    /// The job already reached a terminal status.
    #[error("batch job {id} is already {status}")]
    AlreadyFinished {
        /// Job ID.
        id: BatchJobId,
        /// Terminal status.
        status: BatchStatus,
    },

    /// The worker pool has shut down.
    #[error("batch queue is closed")]
    QueueClosed,

    /// Storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl BatchError {
    /// Returns a stable error code for API consumers.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumns(_) => "MISSING_COLUMNS",
            Self::TooManyRows { .. } => "TOO_MANY_ROWS",
            Self::NotFound(_) => "BATCH_NOT_FOUND",
            Self::OutOfScope(_) | Self::AccountOutOfScope(_) => "OUT_OF_SCOPE",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AlreadyFinished { .. } => "BATCH_ALREADY_FINISHED",
            Self::QueueClosed => "QUEUE_CLOSED",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Failure category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingColumns(_) | Self::TooManyRows { .. } => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::OutOfScope(_) | Self::AccountOutOfScope(_) => ErrorCategory::Authorization,
            Self::AccountInactive(_) | Self::AlreadyFinished { .. } => ErrorCategory::Conflict,
            Self::QueueClosed | Self::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.category().status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = BatchError::MissingColumns(vec!["to_zip".into(), "weight".into()]);
        assert_eq!(err.to_string(), "missing required columns: to_zip, weight");
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_terminal_job_is_conflict() {
        let err = BatchError::AlreadyFinished {
            id: BatchJobId::new(),
            status: BatchStatus::Completed,
        };
        assert_eq!(err.error_code(), "BATCH_ALREADY_FINISHED");
        assert_eq!(err.http_status_code(), 409);
    }

    #[test]
    fn test_scope_errors() {
        assert_eq!(BatchError::OutOfScope(BatchJobId::new()).http_status_code(), 403);
        assert_eq!(BatchError::NotFound(BatchJobId::new()).http_status_code(), 404);
    }
}
