//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use creditship_core::account::Account;
use creditship_core::store::Store;
use creditship_shared::types::AccountId;
use tracing::debug;

use crate::{AppState, error::ApiError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Reloads the account named by the token; the stored role and active flag
///    win over the claims
/// 4. Stores the account in request extensions for handlers to access
pub async fn auth_middleware<S: Store>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::unauthorized(
            "MISSING_TOKEN",
            "Authorization header with Bearer token is required",
        )
        .into_response();
    };

    let claims = match state.jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state
        .accounts
        .load_actor(AccountId::from_uuid(claims.account_id()))
        .await
    {
        Ok(account) => {
            request.extensions_mut().insert(Actor(account));
            next.run(request).await
        }
        Err(e) => {
            debug!(account_id = %claims.sub, error = %e, "Token holder rejected");
            ApiError::from(e).into_response()
        }
    }
}

/// Extractor for the authenticated account.
///
/// Use this in handlers behind [`auth_middleware`]:
///
/// ```ignore
/// async fn handler(Actor(actor): Actor) -> impl IntoResponse {
///     // actor.role is the role stored now, not the one in the token
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Actor(pub Account);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("UNAUTHORIZED", "Authentication required"))
    }
}
