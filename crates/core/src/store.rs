//! Persistence ports.
//!
//! These traits are implemented by the db crate for PostgreSQL and by
//! [`crate::memory::MemoryStore`] for tests. Every method is one atomic unit.

use std::future::Future;

use creditship_shared::types::{AccountId, BatchJobId, PageRequest, ShipmentId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{Account, AccountFilter, NewAccount};
use crate::batch::{BatchJob, BatchStatus, NewBatchJob, RawRow, RowResult};
use crate::ledger::{CreditTransaction, LedgerMutation, TransactionFilter};
use crate::shipment::{LabelPurchase, NewShipment, Shipment, ShipmentFilter, ShipmentStatus};

/// Storage failures that are not business-rule violations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached or the statement failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A unique constraint was violated.
    #[error("duplicate value: {0}")]
    Duplicate(String),

    /// A row the operation depends on does not exist.
    #[error("record not found: {0}")]
    Missing(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Why an atomic ledger mutation was not applied.
///
/// When this is returned nothing was written.
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    /// A posting would take the balance below zero.
    #[error("account {account_id} balance {balance} cannot cover {required}")]
    InsufficientBalance {
        /// Account that would be overdrawn.
        account_id: AccountId,
        /// Balance at the time of the check.
        balance: Decimal,
        /// Amount the posting needed.
        required: Decimal,
    },

    /// A posting would take the balance above the storable maximum.
    #[error("account {account_id} balance {balance} cannot take {amount} more")]
    BalanceLimitExceeded {
        /// Account that would overflow.
        account_id: AccountId,
        /// Balance at the time of the check.
        balance: Decimal,
        /// Amount the posting added.
        amount: Decimal,
    },

    /// A posting names an account that does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// The guarded shipment does not exist.
    #[error("shipment not found: {0}")]
    ShipmentNotFound(ShipmentId),

    /// The guarded shipment is not in the expected status.
    #[error("shipment {shipment_id} is {actual}, expected {expected}")]
    ShipmentStatusMismatch {
        /// Shipment ID.
        shipment_id: ShipmentId,
        /// Status the mutation required.
        expected: ShipmentStatus,
        /// Status found.
        actual: ShipmentStatus,
    },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Account persistence.
pub trait AccountStore: Send + Sync {
    /// Find account by ID.
    fn find_account(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Find account by normalized email.
    fn find_account_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Insert a new account with zero balance. `Duplicate` on email clash.
    fn insert_account(
        &self,
        account: NewAccount,
    ) -> impl Future<Output = Result<Account, StoreError>> + Send;

    /// Set the active flag. `None` if the account does not exist.
    fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// IDs of accounts whose creator is `creator_id`.
    fn created_account_ids(
        &self,
        creator_id: AccountId,
    ) -> impl Future<Output = Result<Vec<AccountId>, StoreError>> + Send;

    /// Page of accounts ordered by creation time, plus the total count.
    fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<Account>, u64), StoreError>> + Send;
}

/// The only writer of balances.
pub trait LedgerStore: Send + Sync {
    /// Applies postings and the guarded shipment transition atomically.
    ///
    /// Returns one transaction per posting, in posting order.
    fn apply_mutation(
        &self,
        mutation: LedgerMutation,
    ) -> impl Future<Output = Result<Vec<CreditTransaction>, ApplyError>> + Send;

    /// Page of transactions, newest first, plus the total count.
    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<CreditTransaction>, u64), StoreError>> + Send;
}

/// Shipment persistence outside of ledger mutations.
pub trait ShipmentStore: Send + Sync {
    /// Stage a shipment as `Pending`. `Duplicate` if the batch row is taken.
    fn insert_shipment(
        &self,
        shipment: NewShipment,
    ) -> impl Future<Output = Result<Shipment, StoreError>> + Send;

    /// Find shipment by ID.
    fn find_shipment(
        &self,
        id: ShipmentId,
    ) -> impl Future<Output = Result<Option<Shipment>, StoreError>> + Send;

    /// Shipment staged for a given batch row.
    fn find_batch_row_shipment(
        &self,
        job_id: BatchJobId,
        row_index: u32,
    ) -> impl Future<Output = Result<Option<Shipment>, StoreError>> + Send;

    /// `Pending -> Error`. No-op if the shipment already left `Pending`.
    fn mark_shipment_failed(
        &self,
        id: ShipmentId,
        message: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// `Pending -> Interrupted`. No-op if the shipment already left `Pending`.
    fn mark_shipment_interrupted(
        &self,
        id: ShipmentId,
        message: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// `Pending -> PurchasedUnbilled`, recording the carrier charge.
    fn mark_shipment_unbilled(
        &self,
        id: ShipmentId,
        purchase: &LabelPurchase,
        message: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Page of shipments, newest first, plus the total count.
    fn list_shipments(
        &self,
        filter: &ShipmentFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<Shipment>, u64), StoreError>> + Send;
}

/// Durable batch job queue.
pub trait BatchJobStore: Send + Sync {
    /// Persist a new `Pending` job together with its rows.
    fn insert_batch_job(
        &self,
        job: NewBatchJob,
    ) -> impl Future<Output = Result<BatchJob, StoreError>> + Send;

    /// Find job by ID.
    fn find_batch_job(
        &self,
        id: BatchJobId,
    ) -> impl Future<Output = Result<Option<BatchJob>, StoreError>> + Send;

    /// Rows uploaded with the job.
    fn batch_rows(
        &self,
        id: BatchJobId,
    ) -> impl Future<Output = Result<Vec<RawRow>, StoreError>> + Send;

    /// Move a job to `Processing`.
    fn start_batch_job(
        &self,
        id: BatchJobId,
    ) -> impl Future<Output = Result<BatchJob, StoreError>> + Send;

    /// Count one processed row and append its error, atomically.
    fn record_batch_row(
        &self,
        id: BatchJobId,
        result: &RowResult,
    ) -> impl Future<Output = Result<BatchJob, StoreError>> + Send;

    /// Set a terminal status and completion time.
    fn finish_batch_job(
        &self,
        id: BatchJobId,
        status: BatchStatus,
        fatal_error: Option<String>,
    ) -> impl Future<Output = Result<BatchJob, StoreError>> + Send;

    /// Raise the cancel flag. `None` if the job does not exist.
    fn request_batch_cancel(
        &self,
        id: BatchJobId,
    ) -> impl Future<Output = Result<Option<BatchJob>, StoreError>> + Send;

    /// Page of jobs, newest first. `owner_ids` of `None` lists every job.
    fn list_batch_jobs(
        &self,
        owner_ids: Option<&[AccountId]>,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<BatchJob>, u64), StoreError>> + Send;

    /// Jobs left `Pending` or `Processing`, oldest first.
    fn unfinished_batch_job_ids(
        &self,
    ) -> impl Future<Output = Result<Vec<BatchJobId>, StoreError>> + Send;
}

/// Everything the services need from persistence.
pub trait Store: AccountStore + LedgerStore + ShipmentStore + BatchJobStore + 'static {}

impl<T> Store for T where T: AccountStore + LedgerStore + ShipmentStore + BatchJobStore + 'static {}
