//! Batch upload routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use creditship_core::batch::{BatchJob, BatchStatus, BatchUpload};
use creditship_core::store::Store;
use creditship_shared::types::{AccountId, BatchJobId, PageRequest, PageResponse};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the batch routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/batch", get(list_batches::<S>).post(submit::<S>))
        .route("/batch/{batch_id}", get(get_batch::<S>))
        .route("/batch/{batch_id}/cancel", post(cancel::<S>))
}

/// Query parameters for listing batch jobs.
#[derive(Debug, Default, Deserialize)]
pub struct ListBatchesQuery {
    /// Single owner to show. Must be within the actor's scope.
    pub owner_id: Option<AccountId>,
}

/// Response for an accepted upload.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Job ID to poll.
    pub batch_id: BatchJobId,
    /// Data rows in the upload.
    pub total_rows: u32,
    /// Status at acceptance.
    pub status: BatchStatus,
}

/// POST /batch - Queue an upload for background processing.
///
/// Returns 202 as soon as the job is stored; rows are processed afterwards.
async fn submit<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Json(payload): Json<BatchUpload>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let job = state.batches.submit(&actor, payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            batch_id: job.id,
            total_rows: job.total_rows,
            status: job.status,
        }),
    ))
}

/// GET /batch - Jobs visible to the actor, newest first.
async fn list_batches<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Query(query): Query<ListBatchesQuery>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<BatchJob>>, ApiError> {
    Ok(Json(
        state.batches.list(&actor, query.owner_id, page).await?,
    ))
}

/// GET /batch/{batch_id} - Job progress and error log.
async fn get_batch<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Path(batch_id): Path<BatchJobId>,
) -> Result<Json<BatchJob>, ApiError> {
    Ok(Json(state.batches.get(&actor, batch_id).await?))
}

/// POST /batch/{batch_id}/cancel - Stop the job before its next row.
async fn cancel<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Path(batch_id): Path<BatchJobId>,
) -> Result<Json<BatchJob>, ApiError> {
    Ok(Json(state.batches.cancel(&actor, batch_id).await?))
}
