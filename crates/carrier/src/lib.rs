//! Creditship carrier adapter.
//!
//! Implements [`creditship_core::shipment::CarrierGateway`] against a
//! Shippo-compatible REST API. The adapter owns transport details only:
//! request bodies, auth header, timeout, HTTP status mapping and decoding of
//! carrier JSON into domain quotes and purchases. It never retries.

mod client;
mod dto;

pub use client::{CarrierSetupError, HttpCarrierGateway};
