//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{
    AmountError, CREDIT_SCALE, MAX_CREDIT_AMOUNT, format_credits, validate_credit_amount,
};
pub use pagination::{PageMeta, PageRequest, PageResponse};
