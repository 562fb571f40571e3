//! Shared types, errors, and configuration for Creditship.
//!
//! This crate provides common types used across all other crates:
//! - Credit amounts with fixed-point decimal precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - The error category taxonomy
//! - JWT claims and token service
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::ErrorCategory;
pub use jwt::{JwtConfig, JwtError, JwtService};
