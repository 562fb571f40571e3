//! Ledger service: the only path by which balances change.

use std::sync::Arc;

use creditship_shared::types::{
    AccountId, PageRequest, PageResponse, format_credits, validate_credit_amount,
};
use rust_decimal::Decimal;
use tracing::info;

use super::error::LedgerError;
use super::types::{
    CreditAdjustment, CreditTransaction, HistoryQuery, LedgerMutation, Posting, TransactionFilter,
    TransactionKind,
};
use crate::access::ScopeResolver;
use crate::account::Account;
use crate::shipment::ShipmentTransition;
use crate::store::{AccountStore, ApplyError, LedgerStore, StoreError};

/// Applies balance-changing operations through the store's atomic mutation.
pub struct Ledger<S> {
    store: Arc<S>,
    scopes: ScopeResolver<S>,
}

impl<S: AccountStore + LedgerStore> Ledger<S> {
    /// Create a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        let scopes = ScopeResolver::new(Arc::clone(&store));
        Self { store, scopes }
    }

    /// Credit `input.target_id`.
    ///
    /// Admins mint the credits. A reseller's own balance is debited by the same
    /// amount in the same atomic unit.
    pub async fn assign_credit(
        &self,
        actor: &Account,
        input: CreditAdjustment,
    ) -> Result<CreditTransaction, LedgerError> {
        let amount = validate_credit_amount(input.amount)?;
        let target = self
            .managed_target(actor, input.target_id, "assign credits")
            .await?;
        if !target.active {
            return Err(LedgerError::AccountInactive(target.id));
        }

        let description = note_or(input.description, || {
            format!("Credits assigned by {}", actor.email)
        });
        let mut postings = vec![Posting {
            account_id: target.id,
            amount,
            kind: TransactionKind::CreditAssign,
            description,
            authorized_by: actor.id,
            reference_id: None,
        }];
        if !actor.role.mints_credits() {
            postings.push(Posting {
                account_id: actor.id,
                amount: -amount,
                kind: TransactionKind::CreditAssign,
                description: format!("Credits delegated to {}", target.email),
                authorized_by: actor.id,
                reference_id: None,
            });
        }

        let written = self
            .store
            .apply_mutation(LedgerMutation {
                postings,
                shipment: None,
            })
            .await
            .map_err(|e| match e {
                ApplyError::InsufficientBalance {
                    balance, required, ..
                } => LedgerError::InsufficientAuthorizerBalance { balance, required },
                other => from_apply(other),
            })?;

        info!(
            actor_id = %actor.id,
            target_id = %target.id,
            amount = %amount,
            minted = actor.role.mints_credits(),
            "Credits assigned"
        );
        first(written)
    }

    /// Debit `input.target_id`.
    ///
    /// When a reseller revokes, the amount returns to the reseller's balance.
    pub async fn revoke_credit(
        &self,
        actor: &Account,
        input: CreditAdjustment,
    ) -> Result<CreditTransaction, LedgerError> {
        let amount = validate_credit_amount(input.amount)?;
        let target = self
            .managed_target(actor, input.target_id, "revoke credits")
            .await?;

        let description = note_or(input.description, || {
            format!("Credits revoked by {}", actor.email)
        });
        let mut postings = vec![Posting {
            account_id: target.id,
            amount: -amount,
            kind: TransactionKind::CreditRevoke,
            description,
            authorized_by: actor.id,
            reference_id: None,
        }];
        if !actor.role.mints_credits() {
            postings.push(Posting {
                account_id: actor.id,
                amount,
                kind: TransactionKind::CreditRevoke,
                description: format!("Credits reclaimed from {}", target.email),
                authorized_by: actor.id,
                reference_id: None,
            });
        }

        let written = self
            .store
            .apply_mutation(LedgerMutation {
                postings,
                shipment: None,
            })
            .await
            .map_err(|e| match e {
                ApplyError::InsufficientBalance {
                    balance, required, ..
                } => LedgerError::InsufficientTargetBalance { balance, required },
                other => from_apply(other),
            })?;

        info!(
            actor_id = %actor.id,
            target_id = %target.id,
            amount = %amount,
            "Credits revoked"
        );
        first(written)
    }

    /// Debit a label purchase and apply the shipment transition with it.
    ///
    /// Never calls the carrier; ordering is owned by the shipment lifecycle.
    pub async fn debit_for_purchase(
        &self,
        account_id: AccountId,
        amount: Decimal,
        transition: ShipmentTransition,
        authorized_by: AccountId,
    ) -> Result<CreditTransaction, LedgerError> {
        let amount = validate_credit_amount(amount)?;
        let posting = Posting {
            account_id,
            amount: -amount,
            kind: TransactionKind::LabelPurchase,
            description: format!(
                "Label purchase of {} for shipment {}",
                format_credits(amount),
                transition.shipment_id
            ),
            authorized_by,
            reference_id: Some(transition.shipment_id),
        };
        self.apply_with_shipment(posting, transition).await
    }

    /// Credit a refunded label and apply the shipment transition with it.
    pub async fn credit_for_refund(
        &self,
        account_id: AccountId,
        amount: Decimal,
        transition: ShipmentTransition,
        authorized_by: AccountId,
    ) -> Result<CreditTransaction, LedgerError> {
        let amount = validate_credit_amount(amount)?;
        let posting = Posting {
            account_id,
            amount,
            kind: TransactionKind::LabelRefund,
            description: format!(
                "Refund of {} for shipment {}",
                format_credits(amount),
                transition.shipment_id
            ),
            authorized_by,
            reference_id: Some(transition.shipment_id),
        };
        self.apply_with_shipment(posting, transition).await
    }

    /// Transaction history visible to `actor`, newest first.
    pub async fn history(
        &self,
        actor: &Account,
        query: HistoryQuery,
        page: PageRequest,
    ) -> Result<PageResponse<CreditTransaction>, LedgerError> {
        let page = page.clamped();
        let scope = self.scopes.resolve(actor).await?;
        let account_ids = scope
            .narrow(query.account_id)
            .map_err(LedgerError::OutOfScope)?;
        let filter = TransactionFilter {
            account_ids,
            kind: query.kind,
        };
        let (items, total) = self.store.list_transactions(&filter, page).await?;
        Ok(PageResponse::new(items, page, total))
    }

    async fn apply_with_shipment(
        &self,
        posting: Posting,
        transition: ShipmentTransition,
    ) -> Result<CreditTransaction, LedgerError> {
        let written = self
            .store
            .apply_mutation(LedgerMutation {
                postings: vec![posting],
                shipment: Some(transition),
            })
            .await
            .map_err(from_apply)?;
        first(written)
    }

    /// Loads the target of an assign or revoke after checking the actor may
    /// manage it.
    async fn managed_target(
        &self,
        actor: &Account,
        target_id: AccountId,
        action: &'static str,
    ) -> Result<Account, LedgerError> {
        if !actor.role.manages_credits() {
            return Err(LedgerError::RoleNotPermitted {
                role: actor.role,
                action,
            });
        }
        if !actor.active {
            return Err(LedgerError::AccountInactive(actor.id));
        }

        let scope = self.scopes.resolve(actor).await?;
        if !scope.contains(target_id) {
            return Err(LedgerError::OutOfScope(target_id));
        }

        let target = self
            .store
            .find_account(target_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(target_id))?;
        if target.id == actor.id || !actor.role.outranks(target.role) {
            return Err(LedgerError::TargetNotManaged(target.id));
        }
        Ok(target)
    }
}

fn note_or(description: Option<String>, default: impl FnOnce() -> String) -> String {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(default)
}

fn first(written: Vec<CreditTransaction>) -> Result<CreditTransaction, LedgerError> {
    written
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::Corrupt("ledger mutation wrote no transaction".into()).into())
}

fn from_apply(err: ApplyError) -> LedgerError {
    match err {
        ApplyError::InsufficientBalance {
            balance, required, ..
        } => LedgerError::InsufficientCredits { balance, required },
        ApplyError::BalanceLimitExceeded {
            account_id,
            balance,
            amount,
        } => LedgerError::BalanceLimitExceeded {
            account_id,
            balance,
            amount,
        },
        ApplyError::AccountNotFound(id) => LedgerError::AccountNotFound(id),
        ApplyError::ShipmentNotFound(id) => LedgerError::ShipmentNotFound(id),
        ApplyError::ShipmentStatusMismatch {
            shipment_id,
            expected,
            actual,
        } => LedgerError::ShipmentStateConflict {
            shipment_id,
            expected,
            actual,
        },
        ApplyError::Store(e) => LedgerError::Store(e),
    }
}
