//! Property-based tests for the ledger.
//!
//! - Balances never go negative, whatever the operation sequence
//! - Every balance equals the sum of its signed transaction amounts
//! - Reseller draw-down conserves credits between reseller and user

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::Ledger;
use super::types::CreditAdjustment;
use crate::access::Role;
use crate::account::Account;
use crate::memory::MemoryStore;

/// Strategy to generate amounts from 0.01 to 500.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone)]
enum Op {
    AdminFundsReseller(Decimal),
    ResellerAssigns(Decimal),
    ResellerRevokes(Decimal),
    AdminRevokesUser(Decimal),
    AdminRevokesReseller(Decimal),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        amount().prop_map(Op::AdminFundsReseller),
        amount().prop_map(Op::ResellerAssigns),
        amount().prop_map(Op::ResellerRevokes),
        amount().prop_map(Op::AdminRevokesUser),
        amount().prop_map(Op::AdminRevokesReseller),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn adjust(target: &Account, amount: Decimal) -> CreditAdjustment {
    CreditAdjustment {
        target_id: target.id,
        amount,
        description: None,
    }
}

fn assert_reconciled(store: &MemoryStore, account: &Account) -> Result<(), TestCaseError> {
    let balance = store.account(account.id).unwrap().balance;
    let sum: Decimal = store
        .transactions_of(account.id)
        .iter()
        .map(|t| t.amount)
        .sum();
    prop_assert!(balance >= Decimal::ZERO, "negative balance {}", balance);
    prop_assert_eq!(balance, sum);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// *For any* sequence of assign and revoke operations, each account's
    /// balance stays non-negative and equals the sum of its transactions.
    #[test]
    fn prop_balances_reconcile_with_transactions(ops in prop::collection::vec(op(), 1..40)) {
        let rt = runtime();
        let store = Arc::new(MemoryStore::new());
        let admin = store.seed_account(Role::Admin, None);
        let reseller = store.seed_account(Role::Reseller, Some(admin.id));
        let user = store.seed_account(Role::User, Some(reseller.id));
        let ledger = Ledger::new(Arc::clone(&store));

        for op in ops {
            let before = store.account(reseller.id).unwrap().balance
                + store.account(user.id).unwrap().balance;

            let result = rt.block_on(async {
                match op {
                    Op::AdminFundsReseller(a) => {
                        ledger.assign_credit(&admin, adjust(&reseller, a)).await
                    }
                    Op::ResellerAssigns(a) => {
                        ledger.assign_credit(&reseller, adjust(&user, a)).await
                    }
                    Op::ResellerRevokes(a) => {
                        ledger.revoke_credit(&reseller, adjust(&user, a)).await
                    }
                    Op::AdminRevokesUser(a) => ledger.revoke_credit(&admin, adjust(&user, a)).await,
                    Op::AdminRevokesReseller(a) => {
                        ledger.revoke_credit(&admin, adjust(&reseller, a)).await
                    }
                }
            });

            let after = store.account(reseller.id).unwrap().balance
                + store.account(user.id).unwrap().balance;
            if matches!(op, Op::ResellerAssigns(_) | Op::ResellerRevokes(_)) || result.is_err() {
                prop_assert_eq!(before, after);
            }

            assert_reconciled(&store, &reseller)?;
            assert_reconciled(&store, &user)?;
            assert_reconciled(&store, &admin)?;
        }
    }

    /// *For any* reseller balance and requested amount, an assignment either
    /// moves exactly that amount or changes nothing.
    #[test]
    fn prop_reseller_assign_all_or_nothing(funded in amount(), requested in amount()) {
        let rt = runtime();
        let store = Arc::new(MemoryStore::new());
        let admin = store.seed_account(Role::Admin, None);
        let reseller = store.seed_account(Role::Reseller, Some(admin.id));
        let user = store.seed_account(Role::User, Some(reseller.id));
        let ledger = Ledger::new(Arc::clone(&store));
        store.grant(reseller.id, funded).unwrap();

        let result = rt.block_on(ledger.assign_credit(&reseller, adjust(&user, requested)));

        let reseller_balance = store.account(reseller.id).unwrap().balance;
        let user_balance = store.account(user.id).unwrap().balance;
        if requested <= funded {
            prop_assert!(result.is_ok());
            prop_assert_eq!(reseller_balance, funded - requested);
            prop_assert_eq!(user_balance, requested);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(reseller_balance, funded);
            prop_assert_eq!(user_balance, Decimal::ZERO);
        }
    }
}
