//! Accounts: provisioning, lookup and login.

mod error;
mod service;
mod types;

pub use error::AccountError;
pub use service::{AccountQuery, AccountService};
pub use types::{Account, AccountFilter, CreateAccountInput, NewAccount};
