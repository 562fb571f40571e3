//! Credit assignment, revocation and history routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use creditship_core::ledger::{CreditAdjustment, CreditTransaction, HistoryQuery};
use creditship_core::store::Store;
use creditship_shared::types::{AccountId, PageRequest, PageResponse, TransactionId};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the credit routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/credits/assign", post(assign::<S>))
        .route("/credits/revoke", post(revoke::<S>))
        .route("/transactions", get(list_transactions::<S>))
}

/// Response for an assign or revoke: the target-side transaction.
#[derive(Debug, Serialize)]
pub struct CreditResponse {
    /// Transaction ID.
    pub transaction_id: TransactionId,
    /// Target account.
    pub account_id: AccountId,
    /// Signed change to the target.
    pub amount: Decimal,
    /// Target balance after the change.
    pub balance_after: Decimal,
    /// Write time.
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransaction> for CreditResponse {
    fn from(tx: CreditTransaction) -> Self {
        Self {
            transaction_id: tx.id,
            account_id: tx.account_id,
            amount: tx.amount,
            balance_after: tx.balance_after,
            created_at: tx.created_at,
        }
    }
}

/// POST /credits/assign
async fn assign<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Json(payload): Json<CreditAdjustment>,
) -> Result<Json<CreditResponse>, ApiError> {
    let tx = state.ledger.assign_credit(&actor, payload).await?;
    Ok(Json(tx.into()))
}

/// POST /credits/revoke
async fn revoke<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Json(payload): Json<CreditAdjustment>,
) -> Result<Json<CreditResponse>, ApiError> {
    let tx = state.ledger.revoke_credit(&actor, payload).await?;
    Ok(Json(tx.into()))
}

/// GET /transactions - Credit history visible to the actor, newest first.
async fn list_transactions<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Query(query): Query<HistoryQuery>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<CreditTransaction>>, ApiError> {
    Ok(Json(state.ledger.history(&actor, query, page).await?))
}
