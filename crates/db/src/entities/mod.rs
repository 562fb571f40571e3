//! `SeaORM` entity definitions.

pub mod prelude;

pub mod accounts;
pub mod batch_jobs;
pub mod credit_transactions;
pub mod sea_orm_active_enums;
pub mod shipments;
