//! Shipping label routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use creditship_core::shipment::{
    Address, Parcel, PurchaseOutcome, PurchaseRequest, RateSelection, Shipment, ShipmentDetails,
    ShipmentQuery, ShipmentStatus,
};
use creditship_core::store::Store;
use creditship_shared::types::{PageRequest, PageResponse, ShipmentId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the label routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/labels", get(list_labels::<S>))
        .route("/labels/purchase", post(purchase::<S>))
        .route("/labels/refund", post(refund::<S>))
        .route("/labels/{shipment_id}", get(get_label::<S>))
        .route("/labels/{shipment_id}/reconcile", post(reconcile::<S>))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for buying a label.
#[derive(Debug, Deserialize)]
pub struct PurchaseLabelRequest {
    /// Sender.
    pub from_address: Address,
    /// Recipient.
    pub to_address: Address,
    /// Package.
    pub parcel: Parcel,
    /// Previously quoted rate. Without one the carrier's cheapest rate is used.
    #[serde(default)]
    pub rate_ref: Option<String>,
}

/// Request body for refunding a label.
#[derive(Debug, Deserialize)]
pub struct RefundLabelRequest {
    /// Shipment to refund.
    pub shipment_id: ShipmentId,
}

/// Response for a purchased (or reconciled) label.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Shipment ID.
    pub shipment_id: ShipmentId,
    /// Shipment status.
    pub status: ShipmentStatus,
    /// Tracking number.
    pub tracking_id: Option<String>,
    /// Printable label location.
    pub label_url: Option<String>,
    /// Credits debited.
    pub cost: Option<Decimal>,
    /// Debit transaction.
    pub transaction_id: TransactionId,
    /// Owner balance after the debit.
    pub balance_after: Decimal,
}

impl From<PurchaseOutcome> for PurchaseResponse {
    fn from(outcome: PurchaseOutcome) -> Self {
        Self {
            shipment_id: outcome.shipment.id,
            status: outcome.shipment.status,
            tracking_id: outcome.shipment.tracking_id,
            label_url: outcome.shipment.label_url,
            cost: outcome.shipment.cost,
            transaction_id: outcome.transaction.id,
            balance_after: outcome.transaction.balance_after,
        }
    }
}

/// Response for a refunded label.
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    /// Shipment ID.
    pub shipment_id: ShipmentId,
    /// Carrier refund ID.
    pub refund_ref: String,
    /// Credits returned; always the cost locked at purchase.
    pub amount: Decimal,
    /// Credit transaction.
    pub transaction_id: TransactionId,
    /// Owner balance after the credit.
    pub balance_after: Decimal,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /labels/purchase - Buy a label for the actor.
async fn purchase<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Json(payload): Json<PurchaseLabelRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    let request = PurchaseRequest {
        details: ShipmentDetails {
            from_address: payload.from_address,
            to_address: payload.to_address,
            parcel: payload.parcel,
        },
        rate: payload
            .rate_ref
            .filter(|r| !r.trim().is_empty())
            .map_or(RateSelection::Cheapest, RateSelection::Quoted),
        batch: None,
    };
    let outcome = state.shipments.purchase(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// POST /labels/refund
async fn refund<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Json(payload): Json<RefundLabelRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let outcome = state.shipments.refund(&actor, payload.shipment_id).await?;
    Ok(Json(RefundResponse {
        shipment_id: outcome.shipment.id,
        refund_ref: outcome.refund_ref,
        amount: outcome.transaction.amount,
        transaction_id: outcome.transaction.id,
        balance_after: outcome.transaction.balance_after,
    }))
}

/// GET /labels - Shipments visible to the actor, newest first.
async fn list_labels<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Query(query): Query<ShipmentQuery>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<Shipment>>, ApiError> {
    Ok(Json(state.shipments.list(&actor, query, page).await?))
}

/// GET /labels/{shipment_id}
async fn get_label<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Path(shipment_id): Path<ShipmentId>,
) -> Result<Json<Shipment>, ApiError> {
    Ok(Json(state.shipments.get(&actor, shipment_id).await?))
}

/// POST /labels/{shipment_id}/reconcile - Bill a label the carrier charged
/// but the ledger never debited.
async fn reconcile<S: Store>(
    State(state): State<AppState<S>>,
    Actor(actor): Actor,
    Path(shipment_id): Path<ShipmentId>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let outcome = state.shipments.reconcile(&actor, shipment_id).await?;
    Ok(Json(outcome.into()))
}
