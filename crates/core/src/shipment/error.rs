//! Shipment lifecycle error types.

use creditship_shared::ErrorCategory;
use creditship_shared::types::ShipmentId;
use rust_decimal::Decimal;
use thiserror::Error;

use super::carrier::CarrierError;
use super::types::ShipmentStatus;
use crate::access::Role;
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Errors that can occur while buying, refunding, or reading labels.
#[derive(Debug, Error)]
pub enum ShipmentError {
    /// Addresses or parcel are incomplete.
    #[error("invalid shipment: {0}")]
    Validation(String),

    /// The carrier priced the label at an amount the ledger cannot hold.
    #[error("carrier quoted an unrepresentable cost: {0}")]
    UnrepresentableCost(Decimal),

    /// Shipment not found.
    #[error("shipment not found: {0}")]
    NotFound(ShipmentId),

    /// Shipment belongs to an account outside the actor's scope.
    #[error("shipment {0} is outside your scope")]
    OutOfScope(ShipmentId),

    /// The actor's role cannot perform this operation.
    #[error("role {role} may not {action}")]
    RoleNotPermitted {
        /// Actor role.
        role: Role,
        /// Attempted action.
        action: &'static str,
    },

    /// Refund attempted on a shipment that is not `Purchased`.
    #[error("shipment {shipment_id} is {status} and cannot be refunded")]
    NotRefundable {
        /// Shipment ID.
        shipment_id: ShipmentId,
        /// Current status.
        status: ShipmentStatus,
    },

    /// Reconcile attempted on a shipment that is not `PurchasedUnbilled`.
    #[error("shipment {shipment_id} is {status} and needs no reconciliation")]
    NotReconcilable {
        /// Shipment ID.
        shipment_id: ShipmentId,
        /// Current status.
        status: ShipmentStatus,
    },

    /// The carrier was unreachable or refused.
    #[error(transparent)]
    Carrier(#[from] CarrierError),

    /// A ledger rule rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The carrier acted but the ledger write did not commit.
    #[error("shipment {shipment_id} requires reconciliation: {reason}")]
    ReconciliationPending {
        /// Shipment flagged for operator review.
        shipment_id: ShipmentId,
        /// Shipment status after flagging.
        status: ShipmentStatus,
        /// Why the ledger write failed.
        reason: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ShipmentError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_SHIPMENT",
            Self::UnrepresentableCost(_) => "UNREPRESENTABLE_COST",
            Self::NotFound(_) => "SHIPMENT_NOT_FOUND",
            Self::OutOfScope(_) => "OUT_OF_SCOPE",
            Self::RoleNotPermitted { .. } => "ROLE_NOT_PERMITTED",
            Self::NotRefundable { .. } => "NOT_REFUNDABLE",
            Self::NotReconcilable { .. } => "NOT_RECONCILABLE",
            Self::Carrier(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::ReconciliationPending { .. } => "RECONCILIATION_PENDING",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Failure category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::UnrepresentableCost(_) => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::OutOfScope(_) | Self::RoleNotPermitted { .. } => ErrorCategory::Authorization,
            Self::NotRefundable { .. } | Self::NotReconcilable { .. } => ErrorCategory::Conflict,
            Self::Carrier(_) => ErrorCategory::External,
            Self::Ledger(e) => e.category(),
            Self::ReconciliationPending { .. } => ErrorCategory::Reconciliation,
            Self::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// Returns true if storage itself failed, as opposed to this one request.
    ///
    /// Batch processing aborts the whole job on these.
    #[must_use]
    pub const fn is_storage_failure(&self) -> bool {
        match self {
            Self::Store(_) => true,
            Self::Ledger(e) => e.is_storage_failure(),
            _ => false,
        }
    }
}
