//! Property-based tests for the credit consumption engine.
//!
//! - Allocation completeness: a covered debit draws exactly its amount
//! - Non-negativity: `credits_available` stays within `[0, credit_amount]`
//! - Expiry exclusion: expired entries are never selected or drawn down
//! - Selection order: results follow the spend order and stop once covered

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::RequestContext;
use tally_shared::types::{CustomerId, EnvironmentId, TenantId, UserId};

use super::consumption::{CreditConsumer, plan_allocations, total_available};
use super::error::WalletError;
use super::memory::InMemoryWalletRepository;
use super::repository::WalletRepository;
use super::service::{CreditRequest, DebitRequest, WalletService};
use super::test_support::credit_entry;
use super::transaction::{TransactionReason, TransactionType, spend_order};
use super::types::{CreateWalletInput, WalletSettings};
use crate::clock::FixedClock;

/// Strategy to generate positive credit amounts (0.01 to 1,000.00).
fn credit_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate an optional expiry, in days from the start instant.
fn expiry_days() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![Just(None), (1i64..60).prop_map(Some)]
}

/// A credit grant or a debit, applied in order.
#[derive(Debug, Clone)]
enum Op {
    Credit(Decimal, Option<i64>),
    Debit(Decimal),
    Advance(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (credit_amount(), expiry_days()).prop_map(|(a, e)| Op::Credit(a, e)),
        credit_amount().prop_map(Op::Debit),
        (1i64..15).prop_map(Op::Advance),
    ]
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A plan over credits that cover the amount draws exactly the amount,
    /// never more than an entry holds.
    #[test]
    fn prop_plan_allocates_exact_amount(
        amounts in prop::collection::vec(credit_amount(), 1..20),
        fraction in 1u32..=100,
    ) {
        let credits: Vec<_> = amounts.iter().map(|a| credit_entry(*a, None)).collect();
        let total = total_available(&credits);
        let amount = (total * Decimal::from(fraction) / Decimal::from(100)).round_dp(2);
        prop_assume!(amount > Decimal::ZERO);

        let plan = plan_allocations(&credits, amount);

        let drawn: Decimal = plan.iter().map(|a| a.consumed).sum();
        prop_assert_eq!(drawn, amount);
        for allocation in &plan {
            prop_assert!(allocation.consumed > Decimal::ZERO);
            prop_assert!(allocation.available_after() >= Decimal::ZERO);
            prop_assert!(allocation.consumed <= allocation.available_before);
        }
    }

    /// A plan over credits that fall short drains all of them.
    #[test]
    fn prop_plan_drains_everything_when_short(
        amounts in prop::collection::vec(credit_amount(), 1..20),
        extra in credit_amount(),
    ) {
        let credits: Vec<_> = amounts.iter().map(|a| credit_entry(*a, None)).collect();
        let total = total_available(&credits);

        let plan = plan_allocations(&credits, total + extra);

        prop_assert_eq!(plan.len(), credits.len());
        prop_assert!(plan.iter().all(|a| a.available_after() == Decimal::ZERO));
    }

    /// Selection never yields expired entries, follows spend order, and is the
    /// shortest prefix covering the requirement.
    #[test]
    fn prop_selection_is_ordered_unexpired_prefix(
        grants in prop::collection::vec((credit_amount(), expiry_days()), 1..25),
        required in credit_amount(),
        elapsed in 0i64..60,
        page_size in 1u64..8,
    ) {
        runtime().block_on(async {
            let repo = Arc::new(InMemoryWalletRepository::new());
            let clock = Arc::new(FixedClock::new(start()));
            let service = WalletService::with_clock(
                Arc::clone(&repo),
                WalletSettings::default(),
                clock.clone(),
            );
            let ctx = RequestContext::new(TenantId::new(), EnvironmentId::new(), UserId::new());
            let wallet = service
                .create_wallet(&ctx, CreateWalletInput::prepaid(CustomerId::new(), "USD"))
                .await
                .unwrap();
            for (amount, days) in &grants {
                let mut request =
                    CreditRequest::credits(wallet.id, *amount, TransactionReason::FreeCredit);
                request.expiry_date = days.map(|d| start() + Duration::days(d));
                service.credit(&ctx, request).await.unwrap();
            }

            let now = start() + Duration::days(elapsed);
            let mut uow = repo.begin(&ctx, wallet.id).await.unwrap();
            let selected = CreditConsumer::new(page_size)
                .find_eligible_credits(&mut uow, required, now)
                .await
                .unwrap();

            prop_assert!(selected.iter().all(|c| c.is_spendable_at(now)));
            prop_assert!(selected.windows(2).all(|w| spend_order(&w[0], &w[1]).is_lt()));

            let sum = total_available(&selected);
            if let Some((last, rest)) = selected.split_last() {
                if sum >= required {
                    prop_assert!(total_available(rest) < required);
                } else {
                    let spendable: Decimal = grants
                        .iter()
                        .filter(|(_, d)| d.is_none_or(|d| start() + Duration::days(d) >= now))
                        .map(|(a, _)| *a)
                        .sum();
                    prop_assert_eq!(sum, spendable);
                }
                prop_assert!(last.credits_available > Decimal::ZERO);
            }
            Ok(())
        })?;
    }

    /// Across any sequence of credits, debits and clock moves, every accepted
    /// debit draws exactly its amount from unexpired entries, rejected debits
    /// change nothing, and the cached balance matches the ledger.
    #[test]
    fn prop_ledger_stays_consistent(ops in prop::collection::vec(op(), 1..30)) {
        runtime().block_on(async {
            let repo = Arc::new(InMemoryWalletRepository::new());
            let clock = Arc::new(FixedClock::new(start()));
            let service = WalletService::with_clock(
                Arc::clone(&repo),
                WalletSettings { credit_page_size: 4, ..WalletSettings::default() },
                clock.clone(),
            );
            let ctx = RequestContext::new(TenantId::new(), EnvironmentId::new(), UserId::new());
            let wallet = service
                .create_wallet(&ctx, CreateWalletInput::prepaid(CustomerId::new(), "USD"))
                .await
                .unwrap();

            for op in ops {
                match op {
                    Op::Credit(amount, days) => {
                        let mut request =
                            CreditRequest::credits(wallet.id, amount, TransactionReason::FreeCredit);
                        request.expiry_date = days.map(|d| clock_now(&clock) + Duration::days(d));
                        service.credit(&ctx, request).await.unwrap();
                    }
                    Op::Advance(days) => clock.advance(Duration::days(days)),
                    Op::Debit(amount) => {
                        let now = clock_now(&clock);
                        let before = credits_of(&repo, wallet.id);
                        let result = service
                            .debit(
                                &ctx,
                                DebitRequest::credits(wallet.id, amount, TransactionReason::InvoicePayment),
                            )
                            .await;
                        let after = credits_of(&repo, wallet.id);

                        let drawn: Decimal = before
                            .iter()
                            .zip(&after)
                            .map(|(b, a)| b.credits_available - a.credits_available)
                            .sum();
                        for (b, a) in before.iter().zip(&after) {
                            if !b.is_spendable_at(now) {
                                prop_assert_eq!(b.credits_available, a.credits_available);
                            }
                        }

                        match result {
                            Ok(_) => prop_assert_eq!(drawn, amount),
                            Err(WalletError::InsufficientBalance { available, .. }) => {
                                prop_assert!(available < amount);
                                prop_assert_eq!(drawn, Decimal::ZERO);
                            }
                            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                        }
                    }
                }

                for entry in credits_of(&repo, wallet.id) {
                    prop_assert!(entry.credits_available >= Decimal::ZERO);
                    prop_assert!(entry.credits_available <= entry.credit_amount);
                }
            }

            let report = service.reconcile(&ctx, wallet.id).await.unwrap();
            prop_assert!(report.ledger.is_consistent());
            prop_assert!(report.breakage >= Decimal::ZERO);
            Ok(())
        })?;
    }
}

fn clock_now(clock: &FixedClock) -> DateTime<Utc> {
    use crate::clock::Clock;
    clock.now()
}

fn credits_of(
    repo: &InMemoryWalletRepository,
    wallet_id: tally_shared::types::WalletId,
) -> Vec<super::transaction::WalletTransaction> {
    repo.entries(wallet_id)
        .into_iter()
        .filter(|e| e.transaction_type == TransactionType::Credit)
        .collect()
}
