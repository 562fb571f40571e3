//! Batch job persistence. Rows and the error log are stored as JSONB.

use chrono::{DateTime, FixedOffset, Utc};
use creditship_core::batch::{BatchJob, BatchStatus, NewBatchJob, RawRow, RowResult};
use creditship_core::store::{BatchJobStore, StoreError};
use creditship_shared::types::{AccountId, BatchJobId, PageRequest};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::convert::db_count;
use super::{PgStore, fetch_page, store_err};
use crate::entities::{batch_jobs, sea_orm_active_enums};

fn missing(id: BatchJobId) -> StoreError {
    StoreError::Missing(format!("batch job {id}"))
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(format!("{what}: {e}")))
}

async fn lock_job(
    txn: &DatabaseTransaction,
    id: BatchJobId,
) -> Result<batch_jobs::Model, StoreError> {
    batch_jobs::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(store_err)?
        .ok_or_else(|| missing(id))
}

impl BatchJobStore for PgStore {
    async fn insert_batch_job(&self, job: NewBatchJob) -> Result<BatchJob, StoreError> {
        let total_rows = u32::try_from(job.rows.len())
            .map_err(|_| StoreError::Corrupt("too many batch rows".into()))?;
        let now = Utc::now().into();
        let model = batch_jobs::ActiveModel {
            id: Set(job.id.into_inner()),
            owner_id: Set(job.owner_id.into_inner()),
            filename: Set(job.filename),
            status: Set(sea_orm_active_enums::BatchStatus::Pending),
            total_rows: Set(db_count(total_rows, "total_rows")?),
            processed_rows: Set(0),
            successful_rows: Set(0),
            failed_rows: Set(0),
            rows: Set(to_json(&job.rows, "batch rows")?),
            error_log: Set(serde_json::Value::Array(Vec::new())),
            fatal_error: Set(None),
            cancel_requested: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        };
        let inserted = model.insert(&self.db).await.map_err(store_err)?;
        BatchJob::try_from(inserted)
    }

    async fn find_batch_job(&self, id: BatchJobId) -> Result<Option<BatchJob>, StoreError> {
        batch_jobs::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(BatchJob::try_from)
            .transpose()
    }

    async fn batch_rows(&self, id: BatchJobId) -> Result<Vec<RawRow>, StoreError> {
        let rows: Option<serde_json::Value> = batch_jobs::Entity::find_by_id(id.into_inner())
            .select_only()
            .column(batch_jobs::Column::Rows)
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(store_err)?;
        let rows = rows.ok_or_else(|| missing(id))?;
        serde_json::from_value(rows)
            .map_err(|e| StoreError::Corrupt(format!("batch job {id} rows: {e}")))
    }

    async fn start_batch_job(&self, id: BatchJobId) -> Result<BatchJob, StoreError> {
        let txn = self.db.begin().await.map_err(store_err)?;
        let model = lock_job(&txn, id).await?;
        if BatchStatus::from(model.status).is_terminal() {
            txn.commit().await.map_err(store_err)?;
            return BatchJob::try_from(model);
        }
        let mut active: batch_jobs::ActiveModel = model.into();
        active.status = Set(sea_orm_active_enums::BatchStatus::Processing);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(store_err)?;
        txn.commit().await.map_err(store_err)?;
        BatchJob::try_from(updated)
    }

    async fn record_batch_row(
        &self,
        id: BatchJobId,
        result: &RowResult,
    ) -> Result<BatchJob, StoreError> {
        let txn = self.db.begin().await.map_err(store_err)?;
        let model = lock_job(&txn, id).await?;
        let mut job = BatchJob::try_from(model.clone())?;
        if !job.apply_row(result) {
            return Err(StoreError::Corrupt(format!(
                "batch job {id} has no unprocessed rows"
            )));
        }

        let mut active: batch_jobs::ActiveModel = model.into();
        active.processed_rows = Set(db_count(job.processed_rows, "processed_rows")?);
        active.successful_rows = Set(db_count(job.successful_rows, "successful_rows")?);
        active.failed_rows = Set(db_count(job.failed_rows, "failed_rows")?);
        active.error_log = Set(to_json(&job.error_log, "error log")?);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(store_err)?;
        txn.commit().await.map_err(store_err)?;
        BatchJob::try_from(updated)
    }

    async fn finish_batch_job(
        &self,
        id: BatchJobId,
        status: BatchStatus,
        fatal_error: Option<String>,
    ) -> Result<BatchJob, StoreError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let updated = batch_jobs::ActiveModel {
            id: Set(id.into_inner()),
            status: Set(status.into()),
            fatal_error: Set(fatal_error),
            completed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(store_err)?;
        BatchJob::try_from(updated)
    }

    async fn request_batch_cancel(&self, id: BatchJobId) -> Result<Option<BatchJob>, StoreError> {
        let Some(model) = batch_jobs::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_err)?
        else {
            return Ok(None);
        };
        let mut active: batch_jobs::ActiveModel = model.into();
        active.cancel_requested = Set(true);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.db).await.map_err(store_err)?;
        BatchJob::try_from(updated).map(Some)
    }

    async fn list_batch_jobs(
        &self,
        owner_ids: Option<&[AccountId]>,
        page: PageRequest,
    ) -> Result<(Vec<BatchJob>, u64), StoreError> {
        let mut query = batch_jobs::Entity::find();
        if let Some(ids) = owner_ids {
            query = query.filter(
                batch_jobs::Column::OwnerId.is_in(ids.iter().map(|id| id.into_inner())),
            );
        }
        let query = query
            .order_by_desc(batch_jobs::Column::CreatedAt)
            .order_by_desc(batch_jobs::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page)
            .await
            .map_err(store_err)?;
        let jobs = models
            .into_iter()
            .map(BatchJob::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((jobs, total))
    }

    async fn unfinished_batch_job_ids(&self) -> Result<Vec<BatchJobId>, StoreError> {
        let ids: Vec<Uuid> = batch_jobs::Entity::find()
            .select_only()
            .column(batch_jobs::Column::Id)
            .filter(batch_jobs::Column::Status.is_in([
                sea_orm_active_enums::BatchStatus::Pending,
                sea_orm_active_enums::BatchStatus::Processing,
            ]))
            .order_by_asc(batch_jobs::Column::CreatedAt)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(store_err)?;
        Ok(ids.into_iter().map(BatchJobId::from).collect())
    }
}
