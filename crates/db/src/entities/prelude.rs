//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::batch_jobs::Entity as BatchJobs;
pub use super::credit_transactions::Entity as CreditTransactions;
pub use super::shipments::Entity as Shipments;
