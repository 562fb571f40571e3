//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for accounts, credits, labels and batch uploads
//! - JWT authentication middleware and the acting-account extractor
//! - Mapping of domain errors onto HTTP responses
//!
//! The router is generic over the store so tests can run it against the
//! in-memory store.

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use creditship_core::account::AccountService;
use creditship_core::batch::BatchProcessor;
use creditship_core::ledger::Ledger;
use creditship_core::shipment::{CarrierGateway, ShipmentLifecycle};
use creditship_core::store::Store;
use creditship_shared::JwtService;
use creditship_shared::config::BatchConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
pub struct AppState<S> {
    /// Account provisioning and authentication.
    pub accounts: Arc<AccountService<S>>,
    /// Credit assign, revoke and history.
    pub ledger: Arc<Ledger<S>>,
    /// Label purchase, refund and reconciliation.
    pub shipments: Arc<ShipmentLifecycle<S>>,
    /// Batch upload intake and worker pool.
    pub batches: Arc<BatchProcessor<S>>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            ledger: Arc::clone(&self.ledger),
            shipments: Arc::clone(&self.shipments),
            batches: Arc::clone(&self.batches),
            jwt_service: Arc::clone(&self.jwt_service),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Wire every service over one store and start the batch workers.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        store: Arc<S>,
        carrier: Arc<dyn CarrierGateway>,
        jwt_service: JwtService,
        batch: &BatchConfig,
    ) -> Self {
        let ledger = Arc::new(Ledger::new(Arc::clone(&store)));
        let shipments = Arc::new(ShipmentLifecycle::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            carrier,
        ));
        let batches = Arc::new(BatchProcessor::start(
            Arc::clone(&store),
            Arc::clone(&shipments),
            batch,
        ));
        Self {
            accounts: Arc::new(AccountService::new(store)),
            ledger,
            shipments,
            batches,
            jwt_service: Arc::new(jwt_service),
        }
    }
}

/// Creates the main application router.
pub fn create_router<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
