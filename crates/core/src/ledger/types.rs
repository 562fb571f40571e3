//! Ledger domain types.
//!
//! Amounts on [`CreditTransaction`] and [`Posting`] are signed: positive
//! credits the account, negative debits it. For every account the balance
//! equals the sum of its transaction amounts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use creditship_shared::types::{AccountId, ShipmentId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shipment::ShipmentTransition;

/// Cause of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits assigned by an admin or reseller.
    CreditAssign,
    /// Credits taken back by an admin or reseller.
    CreditRevoke,
    /// Label bought.
    LabelPurchase,
    /// Label refunded.
    LabelRefund,
}

impl TransactionKind {
    /// Wire and database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditAssign => "credit_assign",
            Self::CreditRevoke => "credit_revoke",
            Self::LabelPurchase => "label_purchase",
            Self::LabelRefund => "label_refund",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_assign" => Ok(Self::CreditAssign),
            "credit_revoke" => Ok(Self::CreditRevoke),
            "label_purchase" => Ok(Self::LabelPurchase),
            "label_refund" => Ok(Self::LabelRefund),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Immutable record of one balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditTransaction {
    /// Unique ID.
    pub id: TransactionId,
    /// Account whose balance changed.
    pub account_id: AccountId,
    /// Cause.
    pub kind: TransactionKind,
    /// Signed change.
    pub amount: Decimal,
    /// Balance right after this change.
    pub balance_after: Decimal,
    /// Human-readable note.
    pub description: String,
    /// Actor that authorized the change.
    pub authorized_by: AccountId,
    /// Related shipment for label purchases and refunds.
    pub reference_id: Option<ShipmentId>,
    /// Write time.
    pub created_at: DateTime<Utc>,
}

/// One balance change inside a [`LedgerMutation`].
#[derive(Debug, Clone)]
pub struct Posting {
    /// Account to change.
    pub account_id: AccountId,
    /// Signed change.
    pub amount: Decimal,
    /// Cause.
    pub kind: TransactionKind,
    /// Note stored on the transaction.
    pub description: String,
    /// Authorizing actor.
    pub authorized_by: AccountId,
    /// Related shipment.
    pub reference_id: Option<ShipmentId>,
}

/// Everything a single atomic ledger write applies.
///
/// A store applies all postings and the optional shipment transition in one
/// unit, or nothing at all.
#[derive(Debug, Clone)]
pub struct LedgerMutation {
    /// Balance changes, one transaction row each.
    pub postings: Vec<Posting>,
    /// Shipment status change guarded by its current status.
    pub shipment: Option<ShipmentTransition>,
}

/// Caller input for assign and revoke.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditAdjustment {
    /// Account whose balance changes.
    pub target_id: AccountId,
    /// Positive amount with at most two decimals.
    pub amount: Decimal,
    /// Optional note.
    #[serde(default)]
    pub description: Option<String>,
}

/// History query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    /// Single account to show. Must be within the actor's scope.
    pub account_id: Option<AccountId>,
    /// Restrict to one kind.
    pub kind: Option<TransactionKind>,
}

/// Store-level filter for transaction listings.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to these accounts. `None` means no restriction.
    pub account_ids: Option<Vec<AccountId>>,
    /// Restrict to one kind.
    pub kind: Option<TransactionKind>,
}
