//! API route definitions.

use axum::{Router, middleware};
use creditship_core::store::Store;

use crate::{AppState, middleware::auth_middleware};

pub mod accounts;
pub mod auth;
pub mod batch;
pub mod credits;
pub mod health;
pub mod labels;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state<S: Store>(state: AppState<S>) -> Router<AppState<S>> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(accounts::routes())
        .merge(credits::routes())
        .merge(labels::routes())
        .merge(batch::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S>,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
