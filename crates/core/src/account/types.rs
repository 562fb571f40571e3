//! Account domain types.

use chrono::{DateTime, Utc};
use creditship_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::access::Role;

/// A holder of a credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Login email, unique and stored lowercase.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role in the reseller hierarchy.
    pub role: Role,
    /// Current credit balance, never negative.
    pub balance: Decimal,
    /// Account that provisioned this one. `None` only for bootstrap super-admins.
    pub creator_id: Option<AccountId>,
    /// Inactive accounts cannot log in, buy labels, or receive credits.
    pub active: bool,
    /// Argon2 PHC string.
    #[serde(skip)]
    pub password_hash: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Row to insert when an account is provisioned.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Pre-generated account ID.
    pub id: AccountId,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Provisioning account.
    pub creator_id: Option<AccountId>,
}

/// Caller input for creating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountInput {
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Initial password.
    pub password: String,
    /// Requested role.
    pub role: Role,
}

/// Filter for account listings.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Restrict to these IDs. `None` means no restriction.
    pub ids: Option<Vec<AccountId>>,
    /// Restrict to one role.
    pub role: Option<Role>,
    /// Restrict by active flag.
    pub active: Option<bool>,
}
