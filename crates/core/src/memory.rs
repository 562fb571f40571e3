//! In-memory store and carrier.
//!
//! Used by unit tests and by the API tests. Each store method holds a single
//! mutex for its whole body, so every call is atomic like a DB transaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use creditship_shared::types::{
    AccountId, BatchJobId, MAX_CREDIT_AMOUNT, PageRequest, ShipmentId, TransactionId,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::access::Role;
use crate::account::{Account, AccountFilter, NewAccount};
use crate::auth::hash_password;
use crate::batch::{BatchJob, BatchStatus, NewBatchJob, RawRow, RowResult};
use crate::ledger::{
    CreditTransaction, LedgerMutation, Posting, TransactionFilter, TransactionKind,
};
use crate::shipment::{
    CarrierError, CarrierGateway, LabelPurchase, LabelRefund, NewShipment, RateQuote, Shipment,
    ShipmentDetails, ShipmentFilter, ShipmentStatus, ShipmentTransition,
};
use crate::store::{
    AccountStore, ApplyError, BatchJobStore, LedgerStore, ShipmentStore, StoreError,
};

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    transactions: Vec<CreditTransaction>,
    shipments: HashMap<ShipmentId, Shipment>,
    batch_jobs: HashMap<BatchJobId, (BatchJob, Vec<RawRow>)>,
}

/// Store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    ledger_unavailable: AtomicBool,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    /// Make every call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only `apply_mutation` fail with `StoreError::Unavailable`.
    pub fn fail_ledger_writes(&self, fail: bool) {
        self.ledger_unavailable.store(fail, Ordering::SeqCst);
    }

    /// Insert an account with zero balance and no usable password.
    pub fn seed_account(&self, role: Role, creator_id: Option<AccountId>) -> Account {
        let id = AccountId::new();
        self.insert(NewAccount {
            id,
            email: format!("{role}-{id}@creditship.test"),
            name: format!("{role} {id}"),
            role,
            password_hash: String::new(),
            creator_id,
        })
    }

    /// Insert an account that can log in with `password`.
    pub fn seed_login(
        &self,
        role: Role,
        creator_id: Option<AccountId>,
        email: &str,
        password: &str,
    ) -> Account {
        self.insert(NewAccount {
            id: AccountId::new(),
            email: email.to_lowercase(),
            name: email.to_string(),
            role,
            password_hash: hash_password(password).unwrap_or_default(),
            creator_id,
        })
    }

    fn insert(&self, account: NewAccount) -> Account {
        let now = Utc::now();
        let account = new_account_record(account, now);
        self.lock().accounts.insert(account.id, account.clone());
        account
    }

    /// Credit an account through a self-authorized assign posting.
    pub fn grant(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<CreditTransaction, ApplyError> {
        let mutation = LedgerMutation {
            postings: vec![Posting {
                account_id,
                amount,
                kind: TransactionKind::CreditAssign,
                description: "Opening credits".to_string(),
                authorized_by: account_id,
                reference_id: None,
            }],
            shipment: None,
        };
        let mut written = apply(&mut self.lock(), mutation, Utc::now())?;
        written
            .pop()
            .ok_or_else(|| StoreError::Corrupt("no transaction written".into()).into())
    }

    /// Snapshot of an account.
    pub fn account(&self, id: AccountId) -> Option<Account> {
        self.lock().accounts.get(&id).cloned()
    }

    /// Transactions of one account in write order.
    pub fn transactions_of(&self, id: AccountId) -> Vec<CreditTransaction> {
        self.lock()
            .transactions
            .iter()
            .filter(|t| t.account_id == id)
            .cloned()
            .collect()
    }

    /// Snapshot of a shipment.
    pub fn shipment(&self, id: ShipmentId) -> Option<Shipment> {
        self.lock().shipments.get(&id).cloned()
    }

    /// Shipments owned by an account, oldest first.
    pub fn shipments_of(&self, id: AccountId) -> Vec<Shipment> {
        let mut found: Vec<Shipment> = self
            .lock()
            .shipments
            .values()
            .filter(|s| s.account_id == id)
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.created_at, s.id));
        found
    }
}

fn new_account_record(account: NewAccount, now: DateTime<Utc>) -> Account {
    Account {
        id: account.id,
        email: account.email,
        name: account.name,
        role: account.role,
        balance: Decimal::ZERO,
        creator_id: account.creator_id,
        active: true,
        password_hash: account.password_hash,
        created_at: now,
        updated_at: now,
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    (items.into_iter().skip(offset).take(limit).collect(), total)
}

fn in_set<T: PartialEq>(set: Option<&Vec<T>>, value: &T) -> bool {
    set.is_none_or(|ids| ids.contains(value))
}

/// Validates the whole mutation before writing any part of it.
fn apply(
    state: &mut State,
    mutation: LedgerMutation,
    now: DateTime<Utc>,
) -> Result<Vec<CreditTransaction>, ApplyError> {
    let mut projected: BTreeMap<AccountId, Decimal> = BTreeMap::new();
    for posting in &mutation.postings {
        let current = match projected.get(&posting.account_id) {
            Some(balance) => *balance,
            None => {
                state
                    .accounts
                    .get(&posting.account_id)
                    .ok_or(ApplyError::AccountNotFound(posting.account_id))?
                    .balance
            }
        };
        let next = current
            .checked_add(posting.amount)
            .filter(|next| *next <= MAX_CREDIT_AMOUNT)
            .ok_or(ApplyError::BalanceLimitExceeded {
                account_id: posting.account_id,
                balance: current,
                amount: posting.amount,
            })?;
        if next < Decimal::ZERO {
            return Err(ApplyError::InsufficientBalance {
                account_id: posting.account_id,
                balance: current,
                required: -posting.amount,
            });
        }
        projected.insert(posting.account_id, next);
    }

    if let Some(transition) = &mutation.shipment {
        let shipment = state
            .shipments
            .get(&transition.shipment_id)
            .ok_or(ApplyError::ShipmentNotFound(transition.shipment_id))?;
        if shipment.status != transition.from {
            return Err(ApplyError::ShipmentStatusMismatch {
                shipment_id: transition.shipment_id,
                expected: transition.from,
                actual: shipment.status,
            });
        }
    }

    let mut written = Vec::with_capacity(mutation.postings.len());
    for posting in mutation.postings {
        let Some(account) = state.accounts.get_mut(&posting.account_id) else {
            return Err(ApplyError::AccountNotFound(posting.account_id));
        };
        account.balance += posting.amount;
        account.updated_at = now;
        let transaction = CreditTransaction {
            id: TransactionId::new(),
            account_id: posting.account_id,
            kind: posting.kind,
            amount: posting.amount,
            balance_after: account.balance,
            description: posting.description,
            authorized_by: posting.authorized_by,
            reference_id: posting.reference_id,
            created_at: now,
        };
        state.transactions.push(transaction.clone());
        written.push(transaction);
    }

    if let Some(transition) = mutation.shipment
        && let Some(shipment) = state.shipments.get_mut(&transition.shipment_id)
    {
        apply_transition(shipment, transition, now);
    }
    Ok(written)
}

fn apply_transition(shipment: &mut Shipment, transition: ShipmentTransition, now: DateTime<Utc>) {
    shipment.status = transition.to;
    shipment.updated_at = now;
    if let Some(purchase) = &transition.purchase {
        shipment.record_purchase(purchase, now);
    }
    if let Some(refund_ref) = transition.refund_ref {
        shipment.refund_ref = Some(refund_ref);
        shipment.refunded_at = Some(now);
    }
    if transition.to == ShipmentStatus::Purchased {
        shipment.error_message = None;
    }
}

impl AccountStore for MemoryStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.check()?;
        Ok(self.lock().accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.check()?;
        Ok(self
            .lock()
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.check()?;
        let mut state = self.lock();
        if state.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate(format!("email {}", account.email)));
        }
        let record = new_account_record(account, Utc::now());
        state.accounts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_account_active(
        &self,
        id: AccountId,
        active: bool,
    ) -> Result<Option<Account>, StoreError> {
        self.check()?;
        let mut state = self.lock();
        Ok(state.accounts.get_mut(&id).map(|account| {
            account.active = active;
            account.updated_at = Utc::now();
            account.clone()
        }))
    }

    async fn created_account_ids(
        &self,
        creator_id: AccountId,
    ) -> Result<Vec<AccountId>, StoreError> {
        self.check()?;
        Ok(self
            .lock()
            .accounts
            .values()
            .filter(|a| a.creator_id == Some(creator_id))
            .map(|a| a.id)
            .collect())
    }

    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<(Vec<Account>, u64), StoreError> {
        self.check()?;
        let mut found: Vec<Account> = self
            .lock()
            .accounts
            .values()
            .filter(|a| in_set(filter.ids.as_ref(), &a.id))
            .filter(|a| filter.role.is_none_or(|role| a.role == role))
            .filter(|a| filter.active.is_none_or(|active| a.active == active))
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.created_at, a.id));
        Ok(paginate(found, page))
    }
}

impl LedgerStore for MemoryStore {
    async fn apply_mutation(
        &self,
        mutation: LedgerMutation,
    ) -> Result<Vec<CreditTransaction>, ApplyError> {
        self.check()?;
        if self.ledger_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("ledger writes disabled".into()).into());
        }
        apply(&mut self.lock(), mutation, Utc::now())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<(Vec<CreditTransaction>, u64), StoreError> {
        self.check()?;
        let found: Vec<CreditTransaction> = self
            .lock()
            .transactions
            .iter()
            .rev()
            .filter(|t| in_set(filter.account_ids.as_ref(), &t.account_id))
            .filter(|t| filter.kind.is_none_or(|kind| t.kind == kind))
            .cloned()
            .collect();
        Ok(paginate(found, page))
    }
}

impl ShipmentStore for MemoryStore {
    async fn insert_shipment(&self, shipment: NewShipment) -> Result<Shipment, StoreError> {
        self.check()?;
        let mut state = self.lock();
        if let Some(batch) = shipment.batch
            && state.shipments.values().any(|s| s.batch == Some(batch))
        {
            return Err(StoreError::Duplicate(format!(
                "batch {} row {}",
                batch.job_id, batch.row_index
            )));
        }
        let now = Utc::now();
        let record = Shipment {
            id: shipment.id,
            account_id: shipment.account_id,
            status: ShipmentStatus::Pending,
            rate_ref: None,
            external_purchase_ref: None,
            tracking_id: None,
            label_url: None,
            cost: None,
            carrier: None,
            service_level: None,
            refund_ref: None,
            details: shipment.details,
            batch: shipment.batch,
            error_message: None,
            created_at: now,
            updated_at: now,
            purchased_at: None,
            refunded_at: None,
        };
        state.shipments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, StoreError> {
        self.check()?;
        Ok(self.lock().shipments.get(&id).cloned())
    }

    async fn find_batch_row_shipment(
        &self,
        job_id: BatchJobId,
        row_index: u32,
    ) -> Result<Option<Shipment>, StoreError> {
        self.check()?;
        Ok(self
            .lock()
            .shipments
            .values()
            .find(|s| s.batch.is_some_and(|b| b.job_id == job_id && b.row_index == row_index))
            .cloned())
    }

    async fn mark_shipment_failed(&self, id: ShipmentId, message: &str) -> Result<(), StoreError> {
        self.check()?;
        if let Some(shipment) = self.lock().shipments.get_mut(&id)
            && shipment.status == ShipmentStatus::Pending
        {
            shipment.status = ShipmentStatus::Error;
            shipment.error_message = Some(message.to_string());
            shipment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_shipment_interrupted(
        &self,
        id: ShipmentId,
        message: &str,
    ) -> Result<(), StoreError> {
        self.check()?;
        if let Some(shipment) = self.lock().shipments.get_mut(&id)
            && shipment.status == ShipmentStatus::Pending
        {
            shipment.status = ShipmentStatus::Interrupted;
            shipment.error_message = Some(message.to_string());
            shipment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_shipment_unbilled(
        &self,
        id: ShipmentId,
        purchase: &LabelPurchase,
        message: &str,
    ) -> Result<(), StoreError> {
        self.check()?;
        if let Some(shipment) = self.lock().shipments.get_mut(&id)
            && shipment.status == ShipmentStatus::Pending
        {
            let now = Utc::now();
            shipment.record_purchase(purchase, now);
            shipment.status = ShipmentStatus::PurchasedUnbilled;
            shipment.error_message = Some(message.to_string());
            shipment.updated_at = now;
        }
        Ok(())
    }

    async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
        page: PageRequest,
    ) -> Result<(Vec<Shipment>, u64), StoreError> {
        self.check()?;
        let mut found: Vec<Shipment> = self
            .lock()
            .shipments
            .values()
            .filter(|s| in_set(filter.account_ids.as_ref(), &s.account_id))
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .filter(|s| {
                filter
                    .batch_job_id
                    .is_none_or(|job| s.batch.is_some_and(|b| b.job_id == job))
            })
            .cloned()
            .collect();
        found.sort_by_key(|s| std::cmp::Reverse((s.created_at, s.id)));
        Ok(paginate(found, page))
    }
}

impl BatchJobStore for MemoryStore {
    async fn insert_batch_job(&self, job: NewBatchJob) -> Result<BatchJob, StoreError> {
        self.check()?;
        let total_rows = u32::try_from(job.rows.len())
            .map_err(|_| StoreError::Corrupt("too many batch rows".into()))?;
        let now = Utc::now();
        let record = BatchJob {
            id: job.id,
            owner_id: job.owner_id,
            filename: job.filename,
            status: BatchStatus::Pending,
            total_rows,
            processed_rows: 0,
            successful_rows: 0,
            failed_rows: 0,
            error_log: Vec::new(),
            fatal_error: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.lock()
            .batch_jobs
            .insert(record.id, (record.clone(), job.rows));
        Ok(record)
    }

    async fn find_batch_job(&self, id: BatchJobId) -> Result<Option<BatchJob>, StoreError> {
        self.check()?;
        Ok(self.lock().batch_jobs.get(&id).map(|(job, _)| job.clone()))
    }

    async fn batch_rows(&self, id: BatchJobId) -> Result<Vec<RawRow>, StoreError> {
        self.check()?;
        self.lock()
            .batch_jobs
            .get(&id)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| StoreError::Missing(format!("batch job {id}")))
    }

    async fn start_batch_job(&self, id: BatchJobId) -> Result<BatchJob, StoreError> {
        self.check()?;
        let mut state = self.lock();
        let (job, _) = state
            .batch_jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("batch job {id}")))?;
        if !job.status.is_terminal() {
            job.status = BatchStatus::Processing;
            job.updated_at = Utc::now();
        }
        Ok(job.clone())
    }

    async fn record_batch_row(
        &self,
        id: BatchJobId,
        result: &RowResult,
    ) -> Result<BatchJob, StoreError> {
        self.check()?;
        let mut state = self.lock();
        let (job, _) = state
            .batch_jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("batch job {id}")))?;
        if !job.apply_row(result) {
            return Err(StoreError::Corrupt(format!(
                "batch job {id} has no unprocessed rows"
            )));
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn finish_batch_job(
        &self,
        id: BatchJobId,
        status: BatchStatus,
        fatal_error: Option<String>,
    ) -> Result<BatchJob, StoreError> {
        self.check()?;
        let mut state = self.lock();
        let (job, _) = state
            .batch_jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("batch job {id}")))?;
        let now = Utc::now();
        job.status = status;
        job.fatal_error = fatal_error;
        job.completed_at = Some(now);
        job.updated_at = now;
        Ok(job.clone())
    }

    async fn request_batch_cancel(&self, id: BatchJobId) -> Result<Option<BatchJob>, StoreError> {
        self.check()?;
        Ok(self.lock().batch_jobs.get_mut(&id).map(|(job, _)| {
            job.cancel_requested = true;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn list_batch_jobs(
        &self,
        owner_ids: Option<&[AccountId]>,
        page: PageRequest,
    ) -> Result<(Vec<BatchJob>, u64), StoreError> {
        self.check()?;
        let mut found: Vec<BatchJob> = self
            .lock()
            .batch_jobs
            .values()
            .map(|(job, _)| job)
            .filter(|job| owner_ids.is_none_or(|ids| ids.contains(&job.owner_id)))
            .cloned()
            .collect();
        found.sort_by_key(|job| std::cmp::Reverse((job.created_at, job.id)));
        Ok(paginate(found, page))
    }

    async fn unfinished_batch_job_ids(&self) -> Result<Vec<BatchJobId>, StoreError> {
        self.check()?;
        let mut found: Vec<(DateTime<Utc>, BatchJobId)> = self
            .lock()
            .batch_jobs
            .values()
            .map(|(job, _)| job)
            .filter(|job| !job.status.is_terminal())
            .map(|job| (job.created_at, job.id))
            .collect();
        found.sort();
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }
}

// ============================================================================
// Carrier
// ============================================================================

/// Carrier fake with fixed rates, call recording and failure switches.
#[derive(Default)]
pub struct MemoryCarrier {
    rates: Mutex<HashMap<String, RateQuote>>,
    cheapest: Mutex<Option<Decimal>>,
    purchases: Mutex<Vec<LabelPurchase>>,
    refunds: Mutex<Vec<String>>,
    fail_purchases: AtomicBool,
    fail_refunds: AtomicBool,
    latency: Duration,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryCarrier {
    /// Carrier with no rates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every purchase and refund call.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Register a rate that `fetch_rate` and `purchase_label` accept.
    pub fn add_rate(&self, rate_ref: &str, amount: Decimal) -> RateQuote {
        let quote = RateQuote {
            rate_ref: rate_ref.to_string(),
            amount,
            carrier: "USPS".to_string(),
            service_level: "Priority Mail".to_string(),
        };
        guard(&self.rates).insert(rate_ref.to_string(), quote.clone());
        quote
    }

    /// Price returned by `shop_rate`. `None` makes rate shopping fail.
    pub fn set_cheapest_rate(&self, amount: Option<Decimal>) {
        *guard(&self.cheapest) = amount;
    }

    /// Make purchases fail as if the carrier were down.
    pub fn fail_purchases(&self, fail: bool) {
        self.fail_purchases.store(fail, Ordering::SeqCst);
    }

    /// Make refunds fail with a rejection.
    pub fn fail_refunds(&self, fail: bool) {
        self.fail_refunds.store(fail, Ordering::SeqCst);
    }

    /// Number of labels bought.
    pub fn purchase_count(&self) -> usize {
        guard(&self.purchases).len()
    }

    /// Number of refunds granted.
    pub fn refund_count(&self) -> usize {
        guard(&self.refunds).len()
    }

    /// Total charged by the carrier across purchases.
    pub fn charged_total(&self) -> Decimal {
        guard(&self.purchases).iter().map(|p| p.cost).sum()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl CarrierGateway for MemoryCarrier {
    async fn fetch_rate(&self, rate_ref: &str) -> Result<RateQuote, CarrierError> {
        guard(&self.rates)
            .get(rate_ref)
            .cloned()
            .ok_or_else(|| CarrierError::Rejected(format!("unknown rate {rate_ref}")))
    }

    async fn shop_rate(&self, _details: &ShipmentDetails) -> Result<RateQuote, CarrierError> {
        let amount = (*guard(&self.cheapest))
            .ok_or_else(|| CarrierError::Rejected("no rates available".into()))?;
        let rate_ref = format!("rate_{}", Uuid::new_v4().simple());
        Ok(self.add_rate(&rate_ref, amount))
    }

    async fn purchase_label(&self, rate_ref: &str) -> Result<LabelPurchase, CarrierError> {
        self.pause().await;
        if self.fail_purchases.load(Ordering::SeqCst) {
            return Err(CarrierError::Unreachable("simulated carrier outage".into()));
        }
        let quote = self.fetch_rate(rate_ref).await?;
        let purchase_ref = format!("txn_{}", Uuid::new_v4().simple());
        let purchase = LabelPurchase {
            tracking_id: format!("9400{}", &purchase_ref[4..16]),
            label_url: Some(format!("https://labels.creditship.test/{purchase_ref}.pdf")),
            purchase_ref,
            rate_ref: quote.rate_ref,
            cost: quote.amount,
            carrier: quote.carrier,
            service_level: quote.service_level,
        };
        guard(&self.purchases).push(purchase.clone());
        Ok(purchase)
    }

    async fn refund_label(&self, purchase_ref: &str) -> Result<LabelRefund, CarrierError> {
        self.pause().await;
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(CarrierError::Rejected("refund window closed".into()));
        }
        let known = guard(&self.purchases)
            .iter()
            .any(|p| p.purchase_ref == purchase_ref);
        if !known {
            return Err(CarrierError::Rejected(format!(
                "unknown transaction {purchase_ref}"
            )));
        }
        guard(&self.refunds).push(purchase_ref.to_string());
        Ok(LabelRefund {
            refund_ref: format!("rfnd_{}", Uuid::new_v4().simple()),
        })
    }
}
