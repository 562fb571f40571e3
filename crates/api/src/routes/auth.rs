//! Login route.

use axum::{Json, Router, extract::State, routing::post};
use creditship_core::account::Account;
use creditship_core::store::Store;
use creditship_shared::auth::{LoginRequest, LoginResponse};
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the auth router.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/auth/login", post(login::<S>))
}

/// POST /auth/login - Authenticate an account and return an access token.
async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse<Account>>, ApiError> {
    let account = state
        .accounts
        .authenticate(&payload.email, &payload.password)
        .await
        .inspect_err(|e| info!(email = %payload.email, error = %e, "Login rejected"))?;

    let access_token = state
        .jwt_service
        .generate_access_token(account.id.into_inner(), account.role.as_str())?;

    info!(account_id = %account.id, "Account logged in");

    Ok(Json(LoginResponse {
        account,
        access_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    }))
}
