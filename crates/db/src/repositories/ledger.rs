//! Ledger persistence: atomic balance mutations and transaction history.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use creditship_core::ledger::{
    CreditTransaction, LedgerMutation, Posting, TransactionFilter,
};
use creditship_core::shipment::{LabelPurchase, ShipmentStatus, ShipmentTransition};
use creditship_core::store::{ApplyError, LedgerStore, StoreError};
use creditship_shared::types::{AccountId, MAX_CREDIT_AMOUNT, PageRequest, TransactionId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::{PgStore, fetch_page, store_err};
use crate::entities::{
    accounts, credit_transactions, sea_orm_active_enums, shipments,
};

impl LedgerStore for PgStore {
    /// Applies every posting and the optional shipment transition in one
    /// database transaction.
    ///
    /// Account rows are locked `FOR UPDATE` in ascending id order so two
    /// mutations touching the same pair of accounts cannot deadlock. Any
    /// early return drops the transaction, which rolls it back.
    async fn apply_mutation(
        &self,
        mutation: LedgerMutation,
    ) -> Result<Vec<CreditTransaction>, ApplyError> {
        let txn = self.db.begin().await.map_err(store_err)?;
        let now: DateTime<FixedOffset> = Utc::now().into();

        let mut balances = lock_accounts(&txn, &mutation.postings).await?;
        let mut projected = Vec::with_capacity(mutation.postings.len());
        for posting in &mutation.postings {
            let Some(balance) = balances.get_mut(&posting.account_id) else {
                return Err(ApplyError::AccountNotFound(posting.account_id));
            };
            let next = balance
                .checked_add(posting.amount)
                .filter(|next| *next <= MAX_CREDIT_AMOUNT)
                .ok_or(ApplyError::BalanceLimitExceeded {
                    account_id: posting.account_id,
                    balance: *balance,
                    amount: posting.amount,
                })?;
            if next < Decimal::ZERO {
                return Err(ApplyError::InsufficientBalance {
                    account_id: posting.account_id,
                    balance: *balance,
                    required: -posting.amount,
                });
            }
            *balance = next;
            projected.push(next);
        }

        let shipment = match &mutation.shipment {
            Some(transition) => Some(lock_shipment(&txn, transition).await?),
            None => None,
        };

        for (account_id, balance) in &balances {
            accounts::ActiveModel {
                id: Set(account_id.into_inner()),
                balance: Set(*balance),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(&txn)
            .await
            .map_err(store_err)?;
        }

        let mut written = Vec::with_capacity(mutation.postings.len());
        for (posting, balance_after) in mutation.postings.into_iter().zip(projected) {
            let inserted = transaction_row(posting, balance_after, now)
                .insert(&txn)
                .await
                .map_err(store_err)?;
            written.push(CreditTransaction::from(inserted));
        }

        if let (Some(model), Some(transition)) = (shipment, mutation.shipment) {
            apply_transition(model, transition, now)
                .update(&txn)
                .await
                .map_err(store_err)?;
        }

        txn.commit().await.map_err(store_err)?;
        debug!(rows = written.len(), "Ledger mutation committed");
        Ok(written)
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<(Vec<CreditTransaction>, u64), StoreError> {
        let mut query = credit_transactions::Entity::find();
        if let Some(ids) = &filter.account_ids {
            query = query.filter(
                credit_transactions::Column::AccountId.is_in(ids.iter().map(|id| id.into_inner())),
            );
        }
        if let Some(kind) = filter.kind {
            query = query.filter(
                credit_transactions::Column::Kind
                    .eq(sea_orm_active_enums::TransactionKind::from(kind)),
            );
        }
        let query = query
            .order_by_desc(credit_transactions::Column::CreatedAt)
            .order_by_desc(credit_transactions::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page)
            .await
            .map_err(store_err)?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }
}

/// Locks every account the postings touch and returns their balances.
async fn lock_accounts(
    txn: &DatabaseTransaction,
    postings: &[Posting],
) -> Result<BTreeMap<AccountId, Decimal>, ApplyError> {
    let mut ids: Vec<Uuid> = postings.iter().map(|p| p.account_id.into_inner()).collect();
    ids.sort_unstable();
    ids.dedup();

    let locked = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(ids.clone()))
        .order_by_asc(accounts::Column::Id)
        .lock_exclusive()
        .all(txn)
        .await
        .map_err(store_err)?;

    let balances: BTreeMap<AccountId, Decimal> = locked
        .into_iter()
        .map(|account| (AccountId::from(account.id), account.balance))
        .collect();
    if let Some(missing) = ids
        .into_iter()
        .map(AccountId::from)
        .find(|id| !balances.contains_key(id))
    {
        return Err(ApplyError::AccountNotFound(missing));
    }
    Ok(balances)
}

/// Locks the shipment and checks it is still in the expected status.
async fn lock_shipment(
    txn: &DatabaseTransaction,
    transition: &ShipmentTransition,
) -> Result<shipments::Model, ApplyError> {
    let model = shipments::Entity::find_by_id(transition.shipment_id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(store_err)?
        .ok_or(ApplyError::ShipmentNotFound(transition.shipment_id))?;
    let actual = ShipmentStatus::from(model.status);
    if actual != transition.from {
        return Err(ApplyError::ShipmentStatusMismatch {
            shipment_id: transition.shipment_id,
            expected: transition.from,
            actual,
        });
    }
    Ok(model)
}

fn transaction_row(
    posting: Posting,
    balance_after: Decimal,
    now: DateTime<FixedOffset>,
) -> credit_transactions::ActiveModel {
    credit_transactions::ActiveModel {
        id: Set(TransactionId::new().into_inner()),
        account_id: Set(posting.account_id.into_inner()),
        kind: Set(posting.kind.into()),
        amount: Set(posting.amount),
        balance_after: Set(balance_after),
        description: Set(posting.description),
        authorized_by: Set(posting.authorized_by.into_inner()),
        reference_id: Set(posting.reference_id.map(Into::into)),
        created_at: Set(now),
    }
}

fn apply_transition(
    model: shipments::Model,
    transition: ShipmentTransition,
    now: DateTime<FixedOffset>,
) -> shipments::ActiveModel {
    let mut active: shipments::ActiveModel = model.into();
    active.status = Set(transition.to.into());
    active.updated_at = Set(now);
    if let Some(purchase) = &transition.purchase {
        record_purchase(&mut active, purchase, now);
    }
    if let Some(refund_ref) = transition.refund_ref {
        active.refund_ref = Set(Some(refund_ref));
        active.refunded_at = Set(Some(now));
    }
    if transition.to == ShipmentStatus::Purchased {
        active.error_message = Set(None);
    }
    active
}

/// Copies carrier purchase fields onto a shipment row.
pub(super) fn record_purchase(
    active: &mut shipments::ActiveModel,
    purchase: &LabelPurchase,
    now: DateTime<FixedOffset>,
) {
    active.rate_ref = Set(Some(purchase.rate_ref.clone()));
    active.external_purchase_ref = Set(Some(purchase.purchase_ref.clone()));
    active.tracking_id = Set(Some(purchase.tracking_id.clone()));
    active.label_url = Set(purchase.label_url.clone());
    active.cost = Set(Some(purchase.cost));
    active.carrier = Set(Some(purchase.carrier.clone()));
    active.service_level = Set(Some(purchase.service_level.clone()));
    active.purchased_at = Set(Some(now));
}
