//! Credit ledger.
//!
//! This module implements:
//! - Credit assignment and revocation with reseller draw-down
//! - Purchase debits and refund credits coupled to shipment transitions
//! - The append-only transaction record and scoped history queries
//! - Error types for ledger operations

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::LedgerError;
pub use service::Ledger;
pub use types::{
    CreditAdjustment, CreditTransaction, HistoryQuery, LedgerMutation, Posting, TransactionFilter,
    TransactionKind,
};
