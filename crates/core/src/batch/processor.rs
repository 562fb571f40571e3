//! Background batch processing.
//!
//! Submitted jobs are persisted with their rows before their id is queued, so
//! a restart loses nothing: [`BatchProcessor::resume_unfinished`] re-queues
//! every job left `Pending` or `Processing` and the runner continues at
//! `processed_rows`.
//!
//! Queueing never waits. A job that finds the queue full stays `Pending` in
//! the store and the dispatcher's periodic sweep queues it once there is room.

use std::sync::Arc;
use std::time::Duration;

use creditship_shared::config::BatchConfig;
use creditship_shared::types::{AccountId, BatchJobId, PageRequest, PageResponse};
use dashmap::DashSet;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::error::BatchError;
use super::rows::{MAX_BATCH_ROWS, missing_columns, parse_row};
use super::types::{BatchJob, BatchStatus, BatchUpload, NewBatchJob, RawRow, RowResult};
use crate::access::ScopeResolver;
use crate::account::Account;
use crate::shipment::{
    BatchRowRef, PurchaseRequest, Shipment, ShipmentError, ShipmentLifecycle, ShipmentStatus,
};
use crate::store::{Store, StoreError};

/// Error that stops a job before its last row.
#[derive(Debug, Error)]
enum Abort {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Shipment(ShipmentError),

    #[error("owner account {0} no longer exists")]
    OwnerMissing(AccountId),

    #[error("row {0} is missing from the stored upload")]
    RowMissing(u32),
}

/// Processes one job, row by row.
pub struct BatchRunner<S> {
    store: Arc<S>,
    lifecycle: Arc<ShipmentLifecycle<S>>,
}

impl<S: Store> BatchRunner<S> {
    /// Create a runner.
    #[must_use]
    pub const fn new(store: Arc<S>, lifecycle: Arc<ShipmentLifecycle<S>>) -> Self {
        Self { store, lifecycle }
    }

    /// Run a job to a terminal status, starting at its first unprocessed row.
    ///
    /// Row failures are counted and logged on the job. A storage failure or a
    /// vanished owner aborts the remaining rows and fails the job with a
    /// job-level `fatal_error`. The returned error means even that final
    /// write failed; the job stays unfinished and resumes on the next start.
    pub async fn run_job(&self, id: BatchJobId) -> Result<BatchJob, StoreError> {
        match self.process(id).await {
            Ok(job) => Ok(job),
            Err(abort) => {
                error!(batch_id = %id, error = %abort, "Batch job aborted");
                self.store
                    .finish_batch_job(id, BatchStatus::Failed, Some(abort.to_string()))
                    .await
            }
        }
    }

    async fn process(&self, id: BatchJobId) -> Result<BatchJob, Abort> {
        let job = self
            .store
            .find_batch_job(id)
            .await?
            .ok_or_else(|| StoreError::Missing(format!("batch job {id}")))?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        let rows = self.store.batch_rows(id).await?;
        let mut job = self.store.start_batch_job(id).await?;
        let owner = self
            .store
            .find_account(job.owner_id)
            .await?
            .ok_or(Abort::OwnerMissing(job.owner_id))?;
        info!(
            batch_id = %id,
            owner_id = %owner.id,
            total_rows = job.total_rows,
            resume_at = job.processed_rows,
            "Processing batch job"
        );

        for row_index in job.processed_rows..job.total_rows {
            let current = self
                .store
                .find_batch_job(id)
                .await?
                .ok_or_else(|| StoreError::Missing(format!("batch job {id}")))?;
            if current.cancel_requested {
                info!(
                    batch_id = %id,
                    processed_rows = current.processed_rows,
                    "Batch job cancelled"
                );
                return Ok(self
                    .store
                    .finish_batch_job(id, BatchStatus::Cancelled, None)
                    .await?);
            }

            let row = rows
                .get(row_index as usize)
                .ok_or(Abort::RowMissing(row_index + 1))?;
            let result = match self.store.find_batch_row_shipment(id, row_index).await? {
                Some(staged) => self.account_staged(row_index, staged).await?,
                None => self.purchase_row(&owner, id, row_index, row).await?,
            };
            job = self.store.record_batch_row(id, &result).await?;
        }

        let status = job.final_status();
        let job = self.store.finish_batch_job(id, status, None).await?;
        info!(
            batch_id = %id,
            status = %status,
            successful_rows = job.successful_rows,
            failed_rows = job.failed_rows,
            "Batch job finished"
        );
        Ok(job)
    }

    async fn purchase_row(
        &self,
        owner: &Account,
        job_id: BatchJobId,
        row_index: u32,
        row: &RawRow,
    ) -> Result<RowResult, Abort> {
        let (details, rate) = match parse_row(row) {
            Ok(parsed) => parsed,
            Err(message) => return Ok(RowResult::failed(row_index, message)),
        };
        let request = PurchaseRequest {
            details,
            rate,
            batch: Some(BatchRowRef { job_id, row_index }),
        };
        match self.lifecycle.purchase(owner, request).await {
            Ok(outcome) => {
                debug!(
                    batch_id = %job_id,
                    row_index,
                    shipment_id = %outcome.shipment.id,
                    "Batch row purchased"
                );
                Ok(RowResult::succeeded(row_index))
            }
            Err(e) if e.is_storage_failure() => Err(Abort::Shipment(e)),
            Err(e) => Ok(RowResult::failed(row_index, e.to_string())),
        }
    }

    /// Accounts for a row whose shipment was staged before an interruption.
    async fn account_staged(&self, row_index: u32, staged: Shipment) -> Result<RowResult, Abort> {
        let result = match staged.status {
            ShipmentStatus::Purchased | ShipmentStatus::Refunded => RowResult::succeeded(row_index),
            ShipmentStatus::PurchasedUnbilled => RowResult::failed(
                row_index,
                format!("label {} purchased but awaiting reconciliation", staged.id),
            ),
            ShipmentStatus::Error => RowResult::failed(
                row_index,
                staged
                    .error_message
                    .unwrap_or_else(|| "label purchase failed".to_string()),
            ),
            ShipmentStatus::Interrupted => RowResult::failed(
                row_index,
                format!("label {} interrupted mid-purchase, awaiting review", staged.id),
            ),
            // The process stopped somewhere between staging and the ledger
            // commit, possibly after the carrier charged.
            ShipmentStatus::Pending => {
                let message = "purchase interrupted, carrier outcome unknown";
                error!(
                    reconciliation = true,
                    shipment_id = %staged.id,
                    account_id = %staged.account_id,
                    row_index,
                    "Batch row interrupted mid-purchase, flagged for review"
                );
                self.store.mark_shipment_interrupted(staged.id, message).await?;
                RowResult::failed(
                    row_index,
                    format!("label {} interrupted mid-purchase, awaiting review", staged.id),
                )
            }
        };
        Ok(result)
    }
}

/// Job ids sitting in the queue or running on a worker.
type Tracked = Arc<DashSet<BatchJobId>>;

/// Queue a job unless it is already queued or running.
///
/// `Ok(false)` means the queue was full and the job stays unfinished in the
/// store until a sweep picks it up.
fn enqueue(
    queue: &mpsc::Sender<BatchJobId>,
    tracked: &DashSet<BatchJobId>,
    id: BatchJobId,
) -> Result<bool, BatchError> {
    if !tracked.insert(id) {
        return Ok(true);
    }
    match queue.try_send(id) {
        Ok(()) => Ok(true),
        Err(TrySendError::Full(_)) => {
            tracked.remove(&id);
            warn!(batch_id = %id, "Batch queue full, job waits for the next sweep");
            Ok(false)
        }
        Err(TrySendError::Closed(_)) => {
            tracked.remove(&id);
            Err(BatchError::QueueClosed)
        }
    }
}

/// Queue unfinished jobs the queue had no room for, oldest first.
async fn sweep<S: Store>(
    store: &S,
    queue: &mpsc::Sender<BatchJobId>,
    tracked: &DashSet<BatchJobId>,
) {
    let ids = match store.unfinished_batch_job_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "Batch sweep skipped");
            return;
        }
    };
    for id in ids {
        if !matches!(enqueue(queue, tracked, id), Ok(true)) {
            break;
        }
    }
}

/// Accepts uploads and runs them on a bounded worker pool.
pub struct BatchProcessor<S> {
    store: Arc<S>,
    scopes: ScopeResolver<S>,
    queue: mpsc::Sender<BatchJobId>,
    tracked: Tracked,
}

impl<S: Store> BatchProcessor<S> {
    /// Spawn the dispatcher. Must be called inside a Tokio runtime.
    ///
    /// At most `config.workers` jobs run at once; up to
    /// `config.queue_capacity` further job ids wait in the queue. The
    /// dispatcher stops once the processor is dropped.
    pub fn start(
        store: Arc<S>,
        lifecycle: Arc<ShipmentLifecycle<S>>,
        config: &BatchConfig,
    ) -> Self {
        let (queue, mut jobs) = mpsc::channel::<BatchJobId>(config.queue_capacity.max(1));
        let permits = Arc::new(Semaphore::new(config.workers.max(1)));
        let runner = Arc::new(BatchRunner::new(Arc::clone(&store), lifecycle));
        let tracked: Tracked = Arc::new(DashSet::new());

        let period = Duration::from_millis(config.sweep_interval_ms.max(1));
        let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let weak_queue = queue.downgrade();
        let sweep_store = Arc::clone(&store);
        let dispatch_tracked = Arc::clone(&tracked);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = jobs.recv() => {
                        let Some(id) = received else { break };
                        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                            break;
                        };
                        let runner = Arc::clone(&runner);
                        let tracked = Arc::clone(&dispatch_tracked);
                        tokio::spawn(async move {
                            if let Err(e) = runner.run_job(id).await {
                                error!(batch_id = %id, error = %e, "Batch job left unfinished");
                            }
                            tracked.remove(&id);
                            drop(permit);
                        });
                    }
                    _ = ticks.tick() => {
                        let Some(queue) = weak_queue.upgrade() else { break };
                        sweep(sweep_store.as_ref(), &queue, &dispatch_tracked).await;
                    }
                }
            }
            debug!("Batch dispatcher stopped");
        });

        Self {
            scopes: ScopeResolver::new(Arc::clone(&store)),
            store,
            queue,
            tracked,
        }
    }

    /// Persist an upload and queue it. Returns as soon as the job is stored,
    /// whether or not the queue had room for it.
    ///
    /// The header is the key set of the first row; missing required columns
    /// reject the whole upload before anything is staged.
    pub async fn submit(
        &self,
        owner: &Account,
        upload: BatchUpload,
    ) -> Result<BatchJob, BatchError> {
        if !owner.active {
            return Err(BatchError::AccountInactive(owner.id));
        }
        if upload.rows.len() > MAX_BATCH_ROWS {
            return Err(BatchError::TooManyRows {
                actual: upload.rows.len(),
                max: MAX_BATCH_ROWS,
            });
        }
        if let Some(header) = upload.rows.first() {
            let missing = missing_columns(header);
            if !missing.is_empty() {
                return Err(BatchError::MissingColumns(missing));
            }
        }

        let job = self
            .store
            .insert_batch_job(NewBatchJob {
                id: BatchJobId::new(),
                owner_id: owner.id,
                filename: upload.filename,
                rows: upload.rows,
            })
            .await?;
        info!(
            batch_id = %job.id,
            owner_id = %owner.id,
            total_rows = job.total_rows,
            "Batch job submitted"
        );

        enqueue(&self.queue, &self.tracked, job.id)?;
        Ok(job)
    }

    /// Job by ID, if its owner is within the actor's scope.
    pub async fn get(&self, actor: &Account, id: BatchJobId) -> Result<BatchJob, BatchError> {
        let job = self
            .store
            .find_batch_job(id)
            .await?
            .ok_or(BatchError::NotFound(id))?;
        let scope = self.scopes.resolve(actor).await?;
        if !scope.contains(job.owner_id) {
            return Err(BatchError::OutOfScope(id));
        }
        Ok(job)
    }

    /// Jobs visible to the actor, newest first.
    pub async fn list(
        &self,
        actor: &Account,
        owner_id: Option<AccountId>,
        page: PageRequest,
    ) -> Result<PageResponse<BatchJob>, BatchError> {
        let page = page.clamped();
        let scope = self.scopes.resolve(actor).await?;
        let owner_ids = scope
            .narrow(owner_id)
            .map_err(BatchError::AccountOutOfScope)?;
        let (jobs, total) = self
            .store
            .list_batch_jobs(owner_ids.as_deref(), page)
            .await?;
        Ok(PageResponse::new(jobs, page, total))
    }

    /// Ask the worker to stop before its next row.
    ///
    /// Rows already processed keep their labels and debits.
    pub async fn cancel(&self, actor: &Account, id: BatchJobId) -> Result<BatchJob, BatchError> {
        let job = self.get(actor, id).await?;
        if job.status.is_terminal() {
            return Err(BatchError::AlreadyFinished {
                id,
                status: job.status,
            });
        }
        let job = self
            .store
            .request_batch_cancel(id)
            .await?
            .ok_or(BatchError::NotFound(id))?;
        info!(batch_id = %id, actor_id = %actor.id, "Batch job cancel requested");
        Ok(job)
    }

    /// Queue every job a previous process left unfinished. Returns how many
    /// were found; those the queue cannot hold yet follow on later sweeps.
    pub async fn resume_unfinished(&self) -> Result<usize, BatchError> {
        let ids = self.store.unfinished_batch_job_ids().await?;
        for id in &ids {
            if !enqueue(&self.queue, &self.tracked, *id)? {
                break;
            }
        }
        if !ids.is_empty() {
            info!(count = ids.len(), "Resumed unfinished batch jobs");
        }
        Ok(ids.len())
    }
}
