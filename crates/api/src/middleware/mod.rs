//! Request middleware.

pub mod auth;

pub use auth::{Actor, auth_middleware};
