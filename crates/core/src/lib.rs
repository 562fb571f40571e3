//! Core business logic for Creditship.
//!
//! This crate contains the credit ledger and label purchasing engine with
//! ZERO web or database dependencies. Persistence and the shipping carrier
//! are reached through the ports in [`store`] and [`shipment::CarrierGateway`].
//!
//! # Modules
//!
//! - `access` - Roles, provisioning rules and account visibility
//! - `account` - Account provisioning and login
//! - `ledger` - Credit assignment, revocation and transaction history
//! - `shipment` - Label purchase, refund and reconciliation
//! - `batch` - Background processing of uploaded label rows
//! - `memory` - In-memory store and carrier for tests and local runs

pub mod access;
pub mod account;
pub mod auth;
pub mod batch;
pub mod ledger;
pub mod memory;
pub mod shipment;
pub mod store;

#[cfg(test)]
mod testing;
