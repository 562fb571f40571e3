//! Account roles and the fixed permission table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ScopeRule;

/// Role of an account in the reseller hierarchy.
///
/// Ranked `SuperAdmin > Admin > Reseller > User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator. Provisions admins and mints credits.
    SuperAdmin,
    /// Staff account. Mints credits and manages everyone below it.
    Admin,
    /// Buys credits in bulk and redistributes them to its own users.
    Reseller,
    /// End customer. Spends credits on labels.
    User,
}

/// Unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl Role {
    /// All roles from highest to lowest rank.
    pub const ALL: [Self; 4] = [Self::SuperAdmin, Self::Admin, Self::Reseller, Self::User];

    /// Numeric rank; higher outranks lower.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::SuperAdmin => 3,
            Self::Admin => 2,
            Self::Reseller => 1,
            Self::User => 0,
        }
    }

    /// Returns true if `self` is strictly above `other`.
    #[must_use]
    pub const fn outranks(self, other: Self) -> bool {
        self.rank() > other.rank()
    }

    /// Roles this role may create accounts for.
    #[must_use]
    pub const fn provisionable_roles(self) -> &'static [Self] {
        match self {
            Self::SuperAdmin => &[Self::Admin, Self::Reseller, Self::User],
            Self::Admin => &[Self::Reseller, Self::User],
            Self::Reseller => &[Self::User],
            Self::User => &[],
        }
    }

    /// Returns true if this role may create an account with `child` role.
    #[must_use]
    pub fn can_provision(self, child: Self) -> bool {
        self.provisionable_roles().contains(&child)
    }

    /// Returns true if this role may assign or revoke credits at all.
    #[must_use]
    pub const fn manages_credits(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Returns true if credits assigned by this role are created from nothing
    /// rather than moved out of the actor's own balance.
    #[must_use]
    pub const fn mints_credits(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }

    /// Returns true if this role may settle shipments stuck after a ledger failure.
    #[must_use]
    pub const fn can_reconcile(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }

    /// Visibility rule applied when resolving this role's scope.
    #[must_use]
    pub const fn scope_rule(self) -> ScopeRule {
        match self {
            Self::SuperAdmin | Self::Admin => ScopeRule::Everyone,
            Self::Reseller => ScopeRule::SelfAndCreated,
            Self::User => ScopeRule::SelfOnly,
        }
    }

    /// Wire and database name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Reseller => "reseller",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}
