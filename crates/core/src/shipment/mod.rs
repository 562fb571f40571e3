//! Shipping labels.
//!
//! This module provides:
//! - Shipment, address and parcel types
//! - The carrier gateway port
//! - The purchase / refund / reconcile state machine

mod carrier;
mod error;
mod lifecycle;
mod types;

pub use carrier::{CarrierError, CarrierGateway, LabelPurchase, LabelRefund, RateQuote};
pub use error::ShipmentError;
pub use lifecycle::{PurchaseOutcome, RefundOutcome, ShipmentLifecycle, ShipmentQuery};
pub use types::{
    Address, BatchRowRef, DistanceUnit, MassUnit, NewShipment, Parcel, PurchaseRequest,
    RateSelection, Shipment, ShipmentDetails, ShipmentFilter, ShipmentStatus, ShipmentTransition,
};
