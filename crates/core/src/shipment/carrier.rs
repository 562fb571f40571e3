//! Carrier gateway port.
//!
//! The carrier is billable and unreliable. Nothing here retries: a blind
//! retry of `purchase_label` can charge twice.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::ShipmentDetails;

/// A priced rate offered by the carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    /// Carrier rate ID passed back to `purchase_label`.
    pub rate_ref: String,
    /// Quoted price in credits.
    pub amount: Decimal,
    /// Carrier name.
    pub carrier: String,
    /// Service level name.
    pub service_level: String,
}

/// Result of a successful label purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPurchase {
    /// Carrier transaction ID, used for refunds.
    pub purchase_ref: String,
    /// Rate the label was bought against.
    pub rate_ref: String,
    /// Tracking number.
    pub tracking_id: String,
    /// Amount actually charged.
    pub cost: Decimal,
    /// Printable label location.
    pub label_url: Option<String>,
    /// Carrier name.
    pub carrier: String,
    /// Service level name.
    pub service_level: String,
}

/// Result of a successful refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRefund {
    /// Carrier refund ID.
    pub refund_ref: String,
}

/// Carrier call failures.
#[derive(Debug, Clone, Error)]
pub enum CarrierError {
    /// Network failure or timeout.
    #[error("carrier unreachable: {0}")]
    Unreachable(String),

    /// The carrier answered and refused.
    #[error("carrier rejected the request: {0}")]
    Rejected(String),

    /// The carrier answered with something we could not interpret.
    #[error("invalid carrier response: {0}")]
    InvalidResponse(String),
}

impl CarrierError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        "CARRIER_ERROR"
    }
}

/// Outbound port to the shipping-label carrier.
#[async_trait]
pub trait CarrierGateway: Send + Sync {
    /// Looks up a previously quoted rate.
    async fn fetch_rate(&self, rate_ref: &str) -> Result<RateQuote, CarrierError>;

    /// Asks the carrier for rates on `details` and returns the cheapest.
    async fn shop_rate(&self, details: &ShipmentDetails) -> Result<RateQuote, CarrierError>;

    /// Buys a label against `rate_ref`. Charges the provider's carrier account.
    async fn purchase_label(&self, rate_ref: &str) -> Result<LabelPurchase, CarrierError>;

    /// Requests a refund for a purchased label.
    async fn refund_label(&self, purchase_ref: &str) -> Result<LabelRefund, CarrierError>;
}
