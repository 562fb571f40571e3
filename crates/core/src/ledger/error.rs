//! Ledger error types.

use creditship_shared::ErrorCategory;
use creditship_shared::types::{AccountId, AmountError, ShipmentId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::access::Role;
use crate::shipment::ShipmentStatus;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is not positive or has more than two decimals.
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    // ========== Authorization Errors ==========
    /// The actor's role cannot perform this operation at all.
    #[error("role {role} may not {action}")]
    RoleNotPermitted {
        /// Actor role.
        role: Role,
        /// Attempted action.
        action: &'static str,
    },

    /// Target account is outside the actor's scope.
    #[error("account {0} is outside your scope")]
    OutOfScope(AccountId),

    /// Target is visible but not managed by the actor (itself or not outranked).
    #[error("account {0} is not managed by you")]
    TargetNotManaged(AccountId),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is deactivated.
    #[error("account {0} is inactive")]
    AccountInactive(AccountId),

    // ========== Insufficient Funds ==========
    /// A reseller's balance cannot fund the assignment.
    #[error("authorizer balance {balance} is insufficient for {required}")]
    InsufficientAuthorizerBalance {
        /// Reseller balance.
        balance: Decimal,
        /// Requested amount.
        required: Decimal,
    },

    /// The target's balance cannot cover the revocation.
    #[error("target balance {balance} is insufficient for {required}")]
    InsufficientTargetBalance {
        /// Target balance.
        balance: Decimal,
        /// Requested amount.
        required: Decimal,
    },

    /// The account cannot pay for a label.
    #[error("insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits {
        /// Account balance.
        balance: Decimal,
        /// Label cost.
        required: Decimal,
    },

    /// The credit would push the account past the largest storable balance.
    #[error("account {account_id} balance {balance} cannot take {amount} more")]
    BalanceLimitExceeded {
        /// Account that would overflow.
        account_id: AccountId,
        /// Current balance.
        balance: Decimal,
        /// Amount credited.
        amount: Decimal,
    },

    // ========== Shipment Guard Errors ==========
    /// The shipment was not in the status the mutation required.
    #[error("shipment {shipment_id} is {actual}, expected {expected}")]
    ShipmentStateConflict {
        /// Shipment ID.
        shipment_id: ShipmentId,
        /// Required status.
        expected: ShipmentStatus,
        /// Status found.
        actual: ShipmentStatus,
    },

    /// Shipment not found.
    #[error("shipment not found: {0}")]
    ShipmentNotFound(ShipmentId),

    // ========== Storage Errors ==========
    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::RoleNotPermitted { .. } => "ROLE_NOT_PERMITTED",
            Self::OutOfScope(_) => "OUT_OF_SCOPE",
            Self::TargetNotManaged(_) => "TARGET_NOT_MANAGED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::InsufficientAuthorizerBalance { .. } => "INSUFFICIENT_AUTHORIZER_BALANCE",
            Self::InsufficientTargetBalance { .. } => "INSUFFICIENT_TARGET_BALANCE",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::BalanceLimitExceeded { .. } => "BALANCE_LIMIT_EXCEEDED",
            Self::ShipmentStateConflict { .. } => "SHIPMENT_STATE_CONFLICT",
            Self::ShipmentNotFound(_) => "SHIPMENT_NOT_FOUND",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Failure category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAmount(_) => ErrorCategory::Validation,
            Self::RoleNotPermitted { .. } | Self::OutOfScope(_) | Self::TargetNotManaged(_) => {
                ErrorCategory::Authorization
            }
            Self::AccountNotFound(_) | Self::ShipmentNotFound(_) => ErrorCategory::NotFound,
            Self::AccountInactive(_)
            | Self::BalanceLimitExceeded { .. }
            | Self::ShipmentStateConflict { .. } => ErrorCategory::Conflict,
            Self::InsufficientAuthorizerBalance { .. }
            | Self::InsufficientTargetBalance { .. }
            | Self::InsufficientCredits { .. } => ErrorCategory::InsufficientFunds,
            Self::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// Returns true if the failure came from storage rather than a business rule.
    #[must_use]
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
