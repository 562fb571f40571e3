//! Roles, provisioning rules, and visibility scopes.
//!
//! Every rule that depends on "who may act on whom" is answered here so the
//! ledger, shipment, and batch services share one source of truth.

mod role;
mod scope;

pub use role::{ParseRoleError, Role};
pub use scope::{AccessScope, ScopeResolver, ScopeRule};
