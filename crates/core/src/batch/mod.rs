//! Batch label purchasing from uploaded rows.

mod error;
mod processor;
mod rows;
mod types;

pub use error::BatchError;
pub use processor::{BatchProcessor, BatchRunner};
pub use rows::{MAX_BATCH_ROWS, REQUIRED_COLUMNS, missing_columns, parse_row};
pub use types::{
    BatchJob, BatchStatus, BatchUpload, NewBatchJob, RawRow, RowError, RowOutcome, RowResult,
};
