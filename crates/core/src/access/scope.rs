//! Access scope resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use creditship_shared::types::AccountId;

use crate::account::Account;
use crate::store::{AccountStore, StoreError};

/// How a role's visible account set is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    /// Every account.
    Everyone,
    /// The actor plus accounts it created.
    SelfAndCreated,
    /// Only the actor.
    SelfOnly,
}

/// Accounts an actor may view or affect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// No restriction.
    Everyone,
    /// Exactly these accounts.
    Accounts(BTreeSet<AccountId>),
}

impl AccessScope {
    /// Returns true if `account_id` is visible.
    #[must_use]
    pub fn contains(&self, account_id: AccountId) -> bool {
        match self {
            Self::Everyone => true,
            Self::Accounts(ids) => ids.contains(&account_id),
        }
    }

    /// Store filter for this scope. `None` means unrestricted.
    #[must_use]
    pub fn account_ids(&self) -> Option<Vec<AccountId>> {
        match self {
            Self::Everyone => None,
            Self::Accounts(ids) => Some(ids.iter().copied().collect()),
        }
    }

    /// Narrows the scope to one requested account.
    ///
    /// # Errors
    ///
    /// Returns the requested ID if it lies outside the scope.
    pub fn narrow(
        &self,
        requested: Option<AccountId>,
    ) -> Result<Option<Vec<AccountId>>, AccountId> {
        match requested {
            Some(id) if self.contains(id) => Ok(Some(vec![id])),
            Some(id) => Err(id),
            None => Ok(self.account_ids()),
        }
    }
}

/// Computes an [`AccessScope`] for an actor from its role and the creator
/// hierarchy.
pub struct ScopeResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for ScopeResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AccountStore> ScopeResolver<S> {
    /// Create a resolver over an account store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve the scope of `actor`.
    pub async fn resolve(&self, actor: &Account) -> Result<AccessScope, StoreError> {
        match actor.role.scope_rule() {
            ScopeRule::Everyone => Ok(AccessScope::Everyone),
            ScopeRule::SelfOnly => Ok(AccessScope::Accounts(BTreeSet::from([actor.id]))),
            ScopeRule::SelfAndCreated => {
                let mut ids: BTreeSet<AccountId> = self
                    .store
                    .created_account_ids(actor.id)
                    .await?
                    .into_iter()
                    .collect();
                ids.insert(actor.id);
                Ok(AccessScope::Accounts(ids))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_scope_per_role() {
        let store = Arc::new(MemoryStore::new());
        let admin = store.seed_account(Role::Admin, None);
        let reseller = store.seed_account(Role::Reseller, Some(admin.id));
        let own_user = store.seed_account(Role::User, Some(reseller.id));
        let other_user = store.seed_account(Role::User, Some(admin.id));
        let resolver = ScopeResolver::new(Arc::clone(&store));

        let admin_scope = resolver.resolve(&admin).await.unwrap();
        assert_eq!(admin_scope, AccessScope::Everyone);

        let reseller_scope = resolver.resolve(&reseller).await.unwrap();
        assert!(reseller_scope.contains(reseller.id));
        assert!(reseller_scope.contains(own_user.id));
        assert!(!reseller_scope.contains(other_user.id));
        assert!(!reseller_scope.contains(admin.id));

        let user_scope = resolver.resolve(&own_user).await.unwrap();
        assert_eq!(user_scope, AccessScope::Accounts(BTreeSet::from([own_user.id])));
    }

    #[test]
    fn test_narrow() {
        let me = AccountId::new();
        let stranger = AccountId::new();
        let scope = AccessScope::Accounts(BTreeSet::from([me]));

        assert_eq!(scope.narrow(None).unwrap(), Some(vec![me]));
        assert_eq!(scope.narrow(Some(me)).unwrap(), Some(vec![me]));
        assert_eq!(scope.narrow(Some(stranger)), Err(stranger));
        assert_eq!(AccessScope::Everyone.narrow(None).unwrap(), None);
    }
}
