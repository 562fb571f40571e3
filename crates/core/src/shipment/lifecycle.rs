//! Shipment lifecycle: the state machine coupling carrier calls to the ledger.
//!
//! Carrier calls never run inside a store transaction. The ledger write that
//! records a carrier result is one atomic mutation issued right after it.

use std::sync::Arc;

use creditship_shared::types::{
    AccountId, BatchJobId, PageRequest, PageResponse, ShipmentId, validate_credit_amount,
};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::carrier::{CarrierGateway, LabelPurchase};
use super::error::ShipmentError;
use super::types::{
    NewShipment, PurchaseRequest, RateSelection, Shipment, ShipmentFilter, ShipmentStatus,
    ShipmentTransition,
};
use crate::access::ScopeResolver;
use crate::account::Account;
use crate::ledger::{CreditTransaction, Ledger, LedgerError};
use crate::store::Store;

/// A purchased label and the debit that paid for it.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// Shipment after the purchase.
    pub shipment: Shipment,
    /// `LabelPurchase` transaction.
    pub transaction: CreditTransaction,
}

/// A refunded label and the credit that returned its cost.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    /// Shipment after the refund.
    pub shipment: Shipment,
    /// Carrier refund ID.
    pub refund_ref: String,
    /// `LabelRefund` transaction.
    pub transaction: CreditTransaction,
}

/// Shipment listing parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentQuery {
    /// Single owner to show. Must be within the actor's scope.
    pub account_id: Option<AccountId>,
    /// Restrict to one status.
    pub status: Option<ShipmentStatus>,
    /// Restrict to one batch job.
    pub batch_job_id: Option<BatchJobId>,
}

/// Drives purchases, refunds and reconciliation of shipping labels.
pub struct ShipmentLifecycle<S> {
    store: Arc<S>,
    ledger: Arc<Ledger<S>>,
    carrier: Arc<dyn CarrierGateway>,
    scopes: ScopeResolver<S>,
    account_locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl<S: Store> ShipmentLifecycle<S> {
    /// Create a lifecycle service.
    #[must_use]
    pub fn new(store: Arc<S>, ledger: Arc<Ledger<S>>, carrier: Arc<dyn CarrierGateway>) -> Self {
        Self {
            scopes: ScopeResolver::new(Arc::clone(&store)),
            store,
            ledger,
            carrier,
            account_locks: DashMap::new(),
        }
    }

    /// Serializes balance-sensitive work for one account within this process.
    fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        Arc::clone(self.account_locks.entry(account_id).or_default().value())
    }

    /// Buy a label for `owner`.
    ///
    /// Stages a `Pending` shipment, pre-checks the balance against the quote,
    /// charges the carrier, then debits the ledger and marks the shipment
    /// `Purchased` in one atomic write. The account lock is held throughout so
    /// concurrent purchases for one account see each other's debits.
    pub async fn purchase(
        &self,
        owner: &Account,
        request: PurchaseRequest,
    ) -> Result<PurchaseOutcome, ShipmentError> {
        request
            .details
            .validate()
            .map_err(ShipmentError::Validation)?;
        if !owner.active {
            return Err(LedgerError::AccountInactive(owner.id).into());
        }

        let lock = self.account_lock(owner.id);
        let _guard = lock.lock().await;

        let staged = self
            .store
            .insert_shipment(NewShipment {
                id: ShipmentId::new(),
                account_id: owner.id,
                details: request.details,
                batch: request.batch,
            })
            .await?;

        match self.purchase_staged(&staged, request.rate).await {
            Ok(outcome) => Ok(outcome),
            Err(err @ ShipmentError::ReconciliationPending { .. }) => Err(err),
            Err(err) => {
                self.fail_staged(staged.id, &err).await;
                Err(err)
            }
        }
    }

    async fn purchase_staged(
        &self,
        staged: &Shipment,
        rate: RateSelection,
    ) -> Result<PurchaseOutcome, ShipmentError> {
        let owner_id = staged.account_id;
        let quote = match rate {
            RateSelection::Quoted(rate_ref) => self.carrier.fetch_rate(&rate_ref).await?,
            RateSelection::Cheapest => self.carrier.shop_rate(&staged.details).await?,
        };
        let quoted_cost = validate_credit_amount(quote.amount)
            .map_err(|_| ShipmentError::UnrepresentableCost(quote.amount))?;

        let account = self
            .store
            .find_account(owner_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(owner_id))?;
        if !account.active {
            return Err(LedgerError::AccountInactive(owner_id).into());
        }
        if account.balance < quoted_cost {
            return Err(LedgerError::InsufficientCredits {
                balance: account.balance,
                required: quoted_cost,
            }
            .into());
        }

        let mut purchase = self.carrier.purchase_label(&quote.rate_ref).await?;

        // The carrier has charged; every failure below is a reconciliation gap.
        match validate_credit_amount(purchase.cost) {
            Ok(cost) => purchase.cost = cost,
            Err(e) => {
                let reason = format!("carrier charged {}: {e}", purchase.cost);
                return Err(self.flag_unbilled(staged, &purchase, reason).await);
            }
        }

        let transition = ShipmentTransition {
            shipment_id: staged.id,
            from: ShipmentStatus::Pending,
            to: ShipmentStatus::Purchased,
            purchase: Some(purchase.clone()),
            refund_ref: None,
        };
        let transaction = match self
            .ledger
            .debit_for_purchase(owner_id, purchase.cost, transition, owner_id)
            .await
        {
            Ok(transaction) => transaction,
            Err(e) => return Err(self.flag_unbilled(staged, &purchase, e.to_string()).await),
        };

        info!(
            shipment_id = %staged.id,
            account_id = %owner_id,
            purchase_ref = %purchase.purchase_ref,
            cost = %purchase.cost,
            "Label purchased"
        );

        let shipment = self
            .reload(staged.id)
            .await
            .unwrap_or_else(|| {
                let mut local = staged.clone();
                local.record_purchase(&purchase, transaction.created_at);
                local.status = ShipmentStatus::Purchased;
                local
            });
        Ok(PurchaseOutcome {
            shipment,
            transaction,
        })
    }

    async fn fail_staged(&self, shipment_id: ShipmentId, err: &ShipmentError) {
        if let Err(e) = self
            .store
            .mark_shipment_failed(shipment_id, &err.to_string())
            .await
        {
            warn!(shipment_id = %shipment_id, error = %e, "Failed to mark shipment as errored");
        }
    }

    async fn flag_unbilled(
        &self,
        staged: &Shipment,
        purchase: &LabelPurchase,
        reason: String,
    ) -> ShipmentError {
        error!(
            reconciliation = true,
            shipment_id = %staged.id,
            account_id = %staged.account_id,
            purchase_ref = %purchase.purchase_ref,
            cost = %purchase.cost,
            reason = %reason,
            "Carrier charged but ledger debit did not commit"
        );
        let status = match self
            .store
            .mark_shipment_unbilled(staged.id, purchase, &reason)
            .await
        {
            Ok(()) => ShipmentStatus::PurchasedUnbilled,
            Err(e) => {
                error!(
                    reconciliation = true,
                    shipment_id = %staged.id,
                    purchase_ref = %purchase.purchase_ref,
                    error = %e,
                    "Could not flag shipment as unbilled"
                );
                ShipmentStatus::Pending
            }
        };
        ShipmentError::ReconciliationPending {
            shipment_id: staged.id,
            status,
            reason,
        }
    }

    /// Refund a purchased label.
    ///
    /// The credited amount is always the cost locked at purchase.
    pub async fn refund(
        &self,
        actor: &Account,
        shipment_id: ShipmentId,
    ) -> Result<RefundOutcome, ShipmentError> {
        let visible = self.visible_shipment(actor, shipment_id).await?;

        let lock = self.account_lock(visible.account_id);
        let _guard = lock.lock().await;

        let shipment = self
            .store
            .find_shipment(shipment_id)
            .await?
            .ok_or(ShipmentError::NotFound(shipment_id))?;
        let not_refundable = ShipmentError::NotRefundable {
            shipment_id,
            status: shipment.status,
        };
        if shipment.status != ShipmentStatus::Purchased {
            return Err(not_refundable);
        }
        let (Some(purchase_ref), Some(cost)) =
            (shipment.external_purchase_ref.as_deref(), shipment.cost)
        else {
            return Err(not_refundable);
        };

        let refund = self.carrier.refund_label(purchase_ref).await?;

        let transition = ShipmentTransition {
            shipment_id,
            from: ShipmentStatus::Purchased,
            to: ShipmentStatus::Refunded,
            purchase: None,
            refund_ref: Some(refund.refund_ref.clone()),
        };
        let transaction = match self
            .ledger
            .credit_for_refund(shipment.account_id, cost, transition, actor.id)
            .await
        {
            Ok(transaction) => transaction,
            Err(LedgerError::ShipmentStateConflict { actual, .. }) => {
                warn!(
                    shipment_id = %shipment_id,
                    refund_ref = %refund.refund_ref,
                    status = %actual,
                    "Shipment changed state while the carrier refund was in flight"
                );
                return Err(ShipmentError::NotRefundable {
                    shipment_id,
                    status: actual,
                });
            }
            Err(e) => {
                error!(
                    reconciliation = true,
                    shipment_id = %shipment_id,
                    account_id = %shipment.account_id,
                    purchase_ref = %purchase_ref,
                    refund_ref = %refund.refund_ref,
                    cost = %cost,
                    error = %e,
                    "Carrier refunded but ledger credit did not commit"
                );
                return Err(ShipmentError::ReconciliationPending {
                    shipment_id,
                    status: ShipmentStatus::Purchased,
                    reason: e.to_string(),
                });
            }
        };

        info!(
            shipment_id = %shipment_id,
            account_id = %shipment.account_id,
            refund_ref = %refund.refund_ref,
            amount = %cost,
            "Label refunded"
        );

        let shipment = self.reload(shipment_id).await.unwrap_or_else(|| {
            let mut local = shipment.clone();
            local.status = ShipmentStatus::Refunded;
            local.refund_ref = Some(refund.refund_ref.clone());
            local.refunded_at = Some(transaction.created_at);
            local
        });
        Ok(RefundOutcome {
            shipment,
            refund_ref: refund.refund_ref,
            transaction,
        })
    }

    /// Retry the debit for a shipment the carrier charged but the ledger
    /// never billed. Admin only.
    pub async fn reconcile(
        &self,
        actor: &Account,
        shipment_id: ShipmentId,
    ) -> Result<PurchaseOutcome, ShipmentError> {
        if !actor.role.can_reconcile() {
            return Err(ShipmentError::RoleNotPermitted {
                role: actor.role,
                action: "reconcile shipments",
            });
        }
        let visible = self
            .store
            .find_shipment(shipment_id)
            .await?
            .ok_or(ShipmentError::NotFound(shipment_id))?;

        let lock = self.account_lock(visible.account_id);
        let _guard = lock.lock().await;

        let shipment = self
            .store
            .find_shipment(shipment_id)
            .await?
            .ok_or(ShipmentError::NotFound(shipment_id))?;
        let not_reconcilable = ShipmentError::NotReconcilable {
            shipment_id,
            status: shipment.status,
        };
        if shipment.status != ShipmentStatus::PurchasedUnbilled {
            return Err(not_reconcilable);
        }
        let Some(cost) = shipment.cost else {
            return Err(not_reconcilable);
        };

        let transition = ShipmentTransition {
            shipment_id,
            from: ShipmentStatus::PurchasedUnbilled,
            to: ShipmentStatus::Purchased,
            purchase: None,
            refund_ref: None,
        };
        let transaction = self
            .ledger
            .debit_for_purchase(shipment.account_id, cost, transition, actor.id)
            .await?;

        info!(
            shipment_id = %shipment_id,
            account_id = %shipment.account_id,
            actor_id = %actor.id,
            cost = %cost,
            "Unbilled shipment reconciled"
        );

        let shipment = self.reload(shipment_id).await.unwrap_or_else(|| {
            let mut local = shipment.clone();
            local.status = ShipmentStatus::Purchased;
            local.error_message = None;
            local
        });
        Ok(PurchaseOutcome {
            shipment,
            transaction,
        })
    }

    /// Shipment by ID, if visible to `actor`.
    pub async fn get(
        &self,
        actor: &Account,
        shipment_id: ShipmentId,
    ) -> Result<Shipment, ShipmentError> {
        self.visible_shipment(actor, shipment_id).await
    }

    /// Shipments visible to `actor`, newest first.
    pub async fn list(
        &self,
        actor: &Account,
        query: ShipmentQuery,
        page: PageRequest,
    ) -> Result<PageResponse<Shipment>, ShipmentError> {
        let page = page.clamped();
        let scope = self.scopes.resolve(actor).await?;
        let account_ids = scope
            .narrow(query.account_id)
            .map_err(LedgerError::OutOfScope)?;
        let filter = ShipmentFilter {
            account_ids,
            status: query.status,
            batch_job_id: query.batch_job_id,
        };
        let (items, total) = self.store.list_shipments(&filter, page).await?;
        Ok(PageResponse::new(items, page, total))
    }

    async fn visible_shipment(
        &self,
        actor: &Account,
        shipment_id: ShipmentId,
    ) -> Result<Shipment, ShipmentError> {
        let shipment = self
            .store
            .find_shipment(shipment_id)
            .await?
            .ok_or(ShipmentError::NotFound(shipment_id))?;
        let scope = self.scopes.resolve(actor).await?;
        if !scope.contains(shipment.account_id) {
            return Err(ShipmentError::OutOfScope(shipment_id));
        }
        Ok(shipment)
    }

    async fn reload(&self, shipment_id: ShipmentId) -> Option<Shipment> {
        match self.store.find_shipment(shipment_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(shipment_id = %shipment_id, error = %e, "Could not reload shipment");
                None
            }
        }
    }
}
