//! Account provisioning, lookup and authentication.

use std::sync::Arc;

use creditship_shared::types::{AccountId, PageRequest, PageResponse};
use serde::Deserialize;
use tracing::info;

use super::error::AccountError;
use super::types::{Account, AccountFilter, CreateAccountInput, NewAccount};
use crate::access::{Role, ScopeResolver};
use crate::auth::{MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::store::AccountStore;

/// Account listing parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountQuery {
    /// Restrict to one role.
    pub role: Option<Role>,
    /// Restrict by active flag.
    pub active: Option<bool>,
}

/// Account service.
pub struct AccountService<S> {
    store: Arc<S>,
    scopes: ScopeResolver<S>,
}

impl<S: AccountStore> AccountService<S> {
    /// Create a new account service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        let scopes = ScopeResolver::new(Arc::clone(&store));
        Self { store, scopes }
    }

    /// Provision a new account created by `actor`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The actor's role cannot provision the requested role
    /// - Email, name or password are malformed
    /// - The email is already registered
    pub async fn create(
        &self,
        actor: &Account,
        input: CreateAccountInput,
    ) -> Result<Account, AccountError> {
        if !actor.active {
            return Err(AccountError::Inactive(actor.id));
        }
        if !actor.role.can_provision(input.role) {
            return Err(AccountError::RoleNotPermitted {
                role: actor.role,
                requested: input.role,
            });
        }
        let new_account = prepare(input, Some(actor.id))?;

        let account = self.store.insert_account(new_account).await?;
        info!(
            account_id = %account.id,
            role = %account.role,
            creator_id = %actor.id,
            "Account created"
        );
        Ok(account)
    }

    /// Deactivate an account. History is kept; nothing is deleted.
    pub async fn deactivate(
        &self,
        actor: &Account,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        let target = self.visible(actor, account_id).await?;
        if target.id == actor.id || !actor.role.outranks(target.role) {
            return Err(AccountError::NotManaged(target.id));
        }

        let account = self
            .store
            .set_account_active(account_id, false)
            .await?
            .ok_or(AccountError::NotFound(account_id))?;
        info!(account_id = %account_id, actor_id = %actor.id, "Account deactivated");
        Ok(account)
    }

    /// Account by ID, if visible to `actor`.
    pub async fn get(
        &self,
        actor: &Account,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        self.visible(actor, account_id).await
    }

    /// Accounts visible to `actor`.
    pub async fn list(
        &self,
        actor: &Account,
        query: AccountQuery,
        page: PageRequest,
    ) -> Result<PageResponse<Account>, AccountError> {
        let page = page.clamped();
        let scope = self.scopes.resolve(actor).await?;
        let filter = AccountFilter {
            ids: scope.account_ids(),
            role: query.role,
            active: query.active,
        };
        let (items, total) = self.store.list_accounts(&filter, page).await?;
        Ok(PageResponse::new(items, page, total))
    }

    /// Check login credentials.
    ///
    /// Unknown email, wrong password and malformed stored hashes all report
    /// `InvalidCredentials`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AccountError> {
        let email = normalize_email(email);
        let account = self
            .store
            .find_account_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash).unwrap_or(false) {
            return Err(AccountError::InvalidCredentials);
        }
        if !account.active {
            return Err(AccountError::Inactive(account.id));
        }
        Ok(account)
    }

    /// Load the acting account for an authenticated request.
    pub async fn load_actor(&self, account_id: AccountId) -> Result<Account, AccountError> {
        let account = self
            .store
            .find_account(account_id)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if !account.active {
            return Err(AccountError::Inactive(account.id));
        }
        Ok(account)
    }

    /// Create the initial super-admin unless an account with that email exists.
    ///
    /// Returns the new account, or `None` if nothing was created.
    pub async fn bootstrap_super_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>, AccountError> {
        let normalized = normalize_email(email);
        if self.store.find_account_by_email(&normalized).await?.is_some() {
            return Ok(None);
        }
        let new_account = prepare(
            CreateAccountInput {
                email: normalized,
                name: "Super Admin".to_string(),
                password: password.to_string(),
                role: Role::SuperAdmin,
            },
            None,
        )?;
        let account = self.store.insert_account(new_account).await?;
        info!(account_id = %account.id, "Super-admin bootstrapped");
        Ok(Some(account))
    }

    async fn visible(
        &self,
        actor: &Account,
        account_id: AccountId,
    ) -> Result<Account, AccountError> {
        let scope = self.scopes.resolve(actor).await?;
        if !scope.contains(account_id) {
            return Err(AccountError::OutOfScope(account_id));
        }
        self.store
            .find_account(account_id)
            .await?
            .ok_or(AccountError::NotFound(account_id))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AccountError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        })
        && !email.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(AccountError::Validation(format!("invalid email address: {email}")))
    }
}

fn prepare(
    input: CreateAccountInput,
    creator_id: Option<AccountId>,
) -> Result<NewAccount, AccountError> {
    let email = normalize_email(&input.email);
    validate_email(&email)?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AccountError::Validation("name is required".into()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(NewAccount {
        id: AccountId::new(),
        email,
        name,
        role: input.role,
        password_hash: hash_password(&input.password)?,
        creator_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use rstest::rstest;

    fn input(email: &str, role: Role) -> CreateAccountInput {
        CreateAccountInput {
            email: email.to_string(),
            name: "Acme Shipping".to_string(),
            password: "s3cret-pass".to_string(),
            role,
        }
    }

    fn service() -> (Arc<MemoryStore>, AccountService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), AccountService::new(store))
    }

    #[tokio::test]
    async fn test_create_records_creator() {
        let (store, accounts) = service();
        let admin = store.seed_account(Role::Admin, None);

        let reseller = accounts
            .create(&admin, input("  Sales@Acme.Test ", Role::Reseller))
            .await
            .unwrap();

        assert_eq!(reseller.email, "sales@acme.test");
        assert_eq!(reseller.creator_id, Some(admin.id));
        assert_eq!(reseller.balance, rust_decimal::Decimal::ZERO);
        assert!(reseller.active);
        assert!(reseller.password_hash.starts_with("$argon2id$"));
    }

    #[rstest]
    #[case(Role::Reseller, Role::Reseller)]
    #[case(Role::Reseller, Role::Admin)]
    #[case(Role::Admin, Role::SuperAdmin)]
    #[case(Role::User, Role::User)]
    #[tokio::test]
    async fn test_provisioning_denied(#[case] actor_role: Role, #[case] requested: Role) {
        let (store, accounts) = service();
        let actor = store.seed_account(actor_role, None);

        let err = accounts
            .create(&actor, input("new@acme.test", requested))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::RoleNotPermitted { .. }));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (store, accounts) = service();
        let admin = store.seed_account(Role::Admin, None);

        for bad in ["no-at-sign", "a@nodot", "a b@acme.test", "@acme.test"] {
            let err = accounts.create(&admin, input(bad, Role::User)).await.unwrap_err();
            assert!(matches!(err, AccountError::Validation(_)), "{bad}");
        }

        let mut short = input("short@acme.test", Role::User);
        short.password = "1234".to_string();
        assert!(matches!(
            accounts.create(&admin, short).await,
            Err(AccountError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let (store, accounts) = service();
        let admin = store.seed_account(Role::Admin, None);
        accounts.create(&admin, input("dup@acme.test", Role::User)).await.unwrap();

        let err = accounts
            .create(&admin, input("DUP@acme.test", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (store, accounts) = service();
        let admin = store.seed_account(Role::Admin, None);
        let user = accounts
            .create(&admin, input("user@acme.test", Role::User))
            .await
            .unwrap();

        let ok = accounts.authenticate("USER@acme.test", "s3cret-pass").await.unwrap();
        assert_eq!(ok.id, user.id);

        assert!(matches!(
            accounts.authenticate("user@acme.test", "wrong-pass").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.authenticate("ghost@acme.test", "s3cret-pass").await,
            Err(AccountError::InvalidCredentials)
        ));

        accounts.deactivate(&admin, user.id).await.unwrap();
        assert!(matches!(
            accounts.authenticate("user@acme.test", "s3cret-pass").await,
            Err(AccountError::Inactive(_))
        ));
        assert!(matches!(
            accounts.load_actor(user.id).await,
            Err(AccountError::Inactive(_))
        ));
    }

    #[tokio::test]
    async fn test_deactivate_rules() {
        let (store, accounts) = service();
        let admin = store.seed_account(Role::Admin, None);
        let reseller = store.seed_account(Role::Reseller, Some(admin.id));
        let own = store.seed_account(Role::User, Some(reseller.id));
        let foreign = store.seed_account(Role::User, Some(admin.id));

        assert!(matches!(
            accounts.deactivate(&reseller, foreign.id).await,
            Err(AccountError::OutOfScope(_))
        ));
        assert!(matches!(
            accounts.deactivate(&reseller, reseller.id).await,
            Err(AccountError::NotManaged(_))
        ));

        let deactivated = accounts.deactivate(&reseller, own.id).await.unwrap();
        assert!(!deactivated.active);
        assert!(store.account(own.id).is_some());
    }

    #[tokio::test]
    async fn test_list_is_scoped() {
        let (store, accounts) = service();
        let admin = store.seed_account(Role::Admin, None);
        let reseller = store.seed_account(Role::Reseller, Some(admin.id));
        store.seed_account(Role::User, Some(reseller.id));
        store.seed_account(Role::User, Some(reseller.id));
        store.seed_account(Role::User, Some(admin.id));

        let seen = accounts
            .list(&reseller, AccountQuery::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(seen.meta.total, 3);

        let users_only = accounts
            .list(
                &admin,
                AccountQuery {
                    role: Some(Role::User),
                    active: None,
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(users_only.meta.total, 3);
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let (_store, accounts) = service();

        let created = accounts
            .bootstrap_super_admin("root@creditship.test", "bootstrap-pass")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.role, Role::SuperAdmin);
        assert_eq!(created.creator_id, None);

        let again = accounts
            .bootstrap_super_admin("ROOT@creditship.test", "other-pass-123")
            .await
            .unwrap();
        assert!(again.is_none());
    }
}
