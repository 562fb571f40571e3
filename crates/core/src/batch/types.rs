//! Batch job domain types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use creditship_shared::types::{AccountId, BatchJobId};
use serde::{Deserialize, Serialize};

/// One uploaded row, column name to raw cell value.
pub type RawRow = BTreeMap<String, String>;

/// Processing state of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Queued, no row processed yet.
    Pending,
    /// A worker is processing rows.
    Processing,
    /// Finished with at least one success, or had no rows.
    Completed,
    /// Every row failed, or a fatal error aborted the job.
    Failed,
    /// Stopped on request before the last row.
    Cancelled,
}

impl BatchStatus {
    /// Returns true once the job will not change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Wire and database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error log entry for one failed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// One-based data row number.
    pub row: u32,
    /// What went wrong.
    pub message: String,
}

/// Progress record of an uploaded batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchJob {
    /// Unique ID.
    pub id: BatchJobId,
    /// Account that pays for every row.
    pub owner_id: AccountId,
    /// Uploaded file name.
    pub filename: String,
    /// Current state.
    pub status: BatchStatus,
    /// Number of data rows.
    pub total_rows: u32,
    /// Rows finished, successfully or not.
    pub processed_rows: u32,
    /// Rows that produced a purchased label.
    pub successful_rows: u32,
    /// Rows that failed.
    pub failed_rows: u32,
    /// Per-row failures in processing order.
    pub error_log: Vec<RowError>,
    /// Job-level error that aborted processing.
    pub fatal_error: Option<String>,
    /// Set by a cancel request, honoured before the next row.
    pub cancel_requested: bool,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last progress update.
    pub updated_at: DateTime<Utc>,
    /// Time the job reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A job to persist at submission.
#[derive(Debug, Clone)]
pub struct NewBatchJob {
    /// Pre-generated ID.
    pub id: BatchJobId,
    /// Paying account.
    pub owner_id: AccountId,
    /// File name.
    pub filename: String,
    /// Rows to process.
    pub rows: Vec<RawRow>,
}

/// Caller input for a batch submission.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchUpload {
    /// Original file name, for display.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Parsed CSV rows.
    pub rows: Vec<RawRow>,
}

fn default_filename() -> String {
    "upload.csv".to_string()
}

/// Outcome of a single processed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// A label was purchased.
    Succeeded,
    /// The row failed with a message for the error log.
    Failed(String),
}

/// Row outcome tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    /// Zero-based row index.
    pub row_index: u32,
    /// What happened.
    pub outcome: RowOutcome,
}

impl RowResult {
    /// A successful row.
    #[must_use]
    pub const fn succeeded(row_index: u32) -> Self {
        Self {
            row_index,
            outcome: RowOutcome::Succeeded,
        }
    }

    /// A failed row.
    #[must_use]
    pub fn failed(row_index: u32, message: impl Into<String>) -> Self {
        Self {
            row_index,
            outcome: RowOutcome::Failed(message.into()),
        }
    }

    /// Log entry for a failed row.
    #[must_use]
    pub fn error_entry(&self) -> Option<RowError> {
        match &self.outcome {
            RowOutcome::Succeeded => None,
            RowOutcome::Failed(message) => Some(RowError {
                row: self.row_index + 1,
                message: message.clone(),
            }),
        }
    }
}

impl BatchJob {
    /// Applies a row result to the counters. Used by stores.
    ///
    /// Returns false without changing anything if every row is already
    /// accounted for.
    pub fn apply_row(&mut self, result: &RowResult) -> bool {
        if self.processed_rows >= self.total_rows {
            return false;
        }
        match result.error_entry() {
            None => self.successful_rows += 1,
            Some(entry) => {
                self.failed_rows += 1;
                self.error_log.push(entry);
            }
        }
        self.processed_rows += 1;
        true
    }

    /// Status a job gets after its last row.
    #[must_use]
    pub const fn final_status(&self) -> BatchStatus {
        if self.successful_rows > 0 || self.total_rows == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(total_rows: u32) -> BatchJob {
        let now = Utc::now();
        BatchJob {
            id: BatchJobId::new(),
            owner_id: AccountId::new(),
            filename: "labels.csv".to_string(),
            status: BatchStatus::Processing,
            total_rows,
            processed_rows: 0,
            successful_rows: 0,
            failed_rows: 0,
            error_log: Vec::new(),
            fatal_error: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn test_apply_row_keeps_counters_consistent() {
        let mut j = job(3);
        assert!(j.apply_row(&RowResult::succeeded(0)));
        assert!(j.apply_row(&RowResult::failed(1, "bad zip")));
        assert!(j.apply_row(&RowResult::succeeded(2)));
        assert!(!j.apply_row(&RowResult::succeeded(3)));

        assert_eq!(j.processed_rows, 3);
        assert_eq!(j.processed_rows, j.successful_rows + j.failed_rows);
        assert_eq!(
            j.error_log,
            vec![RowError {
                row: 2,
                message: "bad zip".to_string()
            }]
        );
    }

    #[test]
    fn test_final_status() {
        let mut empty = job(0);
        assert_eq!(empty.final_status(), BatchStatus::Completed);
        assert!(!empty.apply_row(&RowResult::succeeded(0)));

        let mut all_failed = job(2);
        all_failed.apply_row(&RowResult::failed(0, "x"));
        all_failed.apply_row(&RowResult::failed(1, "y"));
        assert_eq!(all_failed.final_status(), BatchStatus::Failed);

        let mut partial = job(2);
        partial.apply_row(&RowResult::failed(0, "x"));
        partial.apply_row(&RowResult::succeeded(1));
        assert_eq!(partial.final_status(), BatchStatus::Completed);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!BatchStatus::Pending.is_terminal());
        assert!(!BatchStatus::Processing.is_terminal());
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
    }
}
