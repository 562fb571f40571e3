//! Account management routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use creditship_core::account::{Account, AccountQuery, CreateAccountInput};
use creditship_core::store::Store;
use creditship_shared::types::{AccountId, PageRequest, PageResponse};

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the account routes (requires auth middleware to be applied externally).
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/me", get(me))
        .route("/accounts", get(list_accounts::<S>).post(create_account::<S>))
        .route("/accounts/{account_id}", get(get_account::<S>))
        .route("/accounts/{account_id}/deactivate", post(deactivate_account::<S>))
}

/// GET /me - The authenticated account, as stored now.
async fn me(Actor(actor): Actor) -> Json<Account> {
    Json(actor)
}

/// GET /accounts - Accounts visible to the actor.
async fn list_accounts<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Query(query): Query<AccountQuery>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<Account>>, ApiError> {
    Ok(Json(state.accounts.list(&actor, query, page).await?))
}

/// POST /accounts - Provision an account one tier below the actor.
async fn create_account<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Json(payload): Json<CreateAccountInput>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state.accounts.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /accounts/{account_id}
async fn get_account<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.accounts.get(&actor, account_id).await?))
}

/// POST /accounts/{account_id}/deactivate
async fn deactivate_account<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.accounts.deactivate(&actor, account_id).await?))
}
