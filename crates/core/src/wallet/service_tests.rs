//! Wallet service tests against the in-memory repository.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::RequestContext;
use tally_shared::types::{
    CustomerId, EnvironmentId, PageRequest, TenantId, UserId, WalletId, WalletTransactionId,
};
use tokio::sync::Barrier;

use super::consumption::CreditConsumer;
use super::conversion::OperationAmount;
use super::error::WalletError;
use super::filter::{SortOrder, TransactionFilter};
use super::memory::InMemoryWalletRepository;
use super::repository::WalletRepository;
use super::service::{CreditRequest, DebitRequest, WalletService};
use super::transaction::{
    Reference, ReferenceType, TransactionReason, TransactionType, WalletTransaction,
};
use super::types::{
    AutoTopupTrigger, CreateWalletInput, InitialCredits, Wallet, WalletSettings, WalletStatus,
};
use crate::clock::FixedClock;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

struct Harness {
    repo: Arc<InMemoryWalletRepository>,
    clock: Arc<FixedClock>,
    service: WalletService<InMemoryWalletRepository>,
    ctx: RequestContext,
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(WalletSettings::default())
    }

    fn with_settings(settings: WalletSettings) -> Self {
        let repo = Arc::new(InMemoryWalletRepository::new());
        let clock = Arc::new(FixedClock::new(start()));
        let service = WalletService::with_clock(Arc::clone(&repo), settings, clock.clone());
        let ctx = RequestContext::new(TenantId::new(), EnvironmentId::new(), UserId::new());
        Self {
            repo,
            clock,
            service,
            ctx,
        }
    }

    async fn wallet(&self) -> Wallet {
        self.service
            .create_wallet(&self.ctx, CreateWalletInput::prepaid(CustomerId::new(), "USD"))
            .await
            .unwrap()
    }

    async fn credit(
        &self,
        wallet_id: WalletId,
        credits: Decimal,
        expiry: Option<DateTime<Utc>>,
    ) -> WalletTransaction {
        let mut request = CreditRequest::credits(wallet_id, credits, TransactionReason::FreeCredit);
        request.expiry_date = expiry;
        self.service.credit(&self.ctx, request).await.unwrap()
    }

    async fn debit(
        &self,
        wallet_id: WalletId,
        credits: Decimal,
    ) -> Result<WalletTransaction, WalletError> {
        self.service
            .debit(
                &self.ctx,
                DebitRequest::credits(wallet_id, credits, TransactionReason::InvoicePayment),
            )
            .await
    }

    async fn credit_balance(&self, wallet_id: WalletId) -> Decimal {
        self.service
            .get_wallet(&self.ctx, wallet_id)
            .await
            .unwrap()
            .credit_balance
    }

    async fn available(&self, transaction_id: WalletTransactionId) -> Decimal {
        self.service
            .get_transaction(&self.ctx, transaction_id)
            .await
            .unwrap()
            .credits_available
    }
}

// ========== Debit / Credit ==========

#[tokio::test]
async fn test_debit_spends_soonest_expiring_credit_first() {
    let h = Harness::new();
    let wallet = h.wallet().await;

    let promo = h
        .credit(wallet.id, dec!(50), Some(start() + Duration::days(30)))
        .await;
    let mut purchase = CreditRequest::credits(
        wallet.id,
        dec!(30),
        TransactionReason::PurchasedCreditDirect,
    );
    purchase.reference = Some(Reference::new(ReferenceType::Payment, "pay_1"));
    let purchase = h.service.credit(&h.ctx, purchase).await.unwrap();

    let debit = h.debit(wallet.id, dec!(60)).await.unwrap();

    assert_eq!(debit.transaction_type, TransactionType::Debit);
    assert_eq!(debit.credit_amount, dec!(60));
    assert_eq!(debit.credit_balance_before, dec!(80));
    assert_eq!(debit.credit_balance_after, dec!(20));
    assert_eq!(h.available(promo.id).await, Decimal::ZERO);
    assert_eq!(h.available(purchase.id).await, dec!(20));
    assert_eq!(h.credit_balance(wallet.id).await, dec!(20));
}

#[tokio::test]
async fn test_insufficient_balance_writes_nothing() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let credit = h.credit(wallet.id, dec!(50), None).await;

    let err = h.debit(wallet.id, dec!(60)).await.unwrap_err();

    match err {
        WalletError::InsufficientBalance {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, dec!(60));
            assert_eq!(available, dec!(50));
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }
    assert_eq!(h.available(credit.id).await, dec!(50));
    assert_eq!(h.credit_balance(wallet.id).await, dec!(50));
    assert_eq!(h.repo.entries(wallet.id).len(), 1);
}

#[tokio::test]
async fn test_debit_validation_order() {
    let h = Harness::new();

    let missing = h.debit(WalletId::new(), Decimal::ZERO).await.unwrap_err();
    assert!(matches!(missing, WalletError::WalletNotFound(_)));

    let wallet = h.wallet().await;
    let zero = h.debit(wallet.id, Decimal::ZERO).await.unwrap_err();
    assert!(matches!(zero, WalletError::InvalidAmount(_)));

    let negative = h.debit(wallet.id, dec!(-1)).await.unwrap_err();
    assert!(matches!(negative, WalletError::InvalidAmount(_)));

    let precise = h.debit(wallet.id, dec!(0.0000000001)).await.unwrap_err();
    assert!(matches!(precise, WalletError::InvalidAmount(_)));

    h.service.freeze_wallet(&h.ctx, wallet.id).await.unwrap();
    let frozen = h.debit(wallet.id, Decimal::ZERO).await.unwrap_err();
    assert!(matches!(
        frozen,
        WalletError::WalletNotActive {
            status: WalletStatus::Frozen,
            ..
        }
    ));
}

#[tokio::test]
async fn test_wallet_of_other_tenant_is_not_found() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    h.credit(wallet.id, dec!(10), None).await;

    let stranger = RequestContext::new(TenantId::new(), h.ctx.environment_id, UserId::new());
    let err = h
        .service
        .debit(
            &stranger,
            DebitRequest::credits(wallet.id, dec!(1), TransactionReason::InvoicePayment),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::WalletNotFound(_)));

    let other_env = RequestContext::new(h.ctx.tenant_id, EnvironmentId::new(), h.ctx.user_id);
    assert!(h.service.get_wallet(&other_env, wallet.id).await.is_err());
}

#[tokio::test]
async fn test_credit_is_idempotent_by_reference() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let request = CreditRequest::credits(wallet.id, dec!(25), TransactionReason::CreditNote)
        .with_reference(Reference::new(ReferenceType::Invoice, "inv_42"));

    let first = h.service.credit(&h.ctx, request.clone()).await.unwrap();
    let second = h.service.credit(&h.ctx, request).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.repo.entries(wallet.id).len(), 1);
    assert_eq!(h.credit_balance(wallet.id).await, dec!(25));
}

#[tokio::test]
async fn test_debit_is_idempotent_by_reference() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    h.credit(wallet.id, dec!(100), None).await;
    let request = DebitRequest::credits(wallet.id, dec!(40), TransactionReason::InvoicePayment)
        .with_reference(Reference::new(ReferenceType::Invoice, "inv_7"));

    let first = h.service.debit(&h.ctx, request.clone()).await.unwrap();
    let second = h.service.debit(&h.ctx, request).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.credit_balance(wallet.id).await, dec!(60));
}

#[tokio::test]
async fn test_credits_without_reference_are_never_deduplicated() {
    let h = Harness::new();
    let wallet = h.wallet().await;

    let a = h.credit(wallet.id, dec!(5), None).await;
    let b = h.credit(wallet.id, dec!(5), None).await;

    assert_ne!(a.id, b.id);
    assert_eq!(a.reference.reference_type, ReferenceType::Request);
    assert_eq!(h.credit_balance(wallet.id).await, dec!(10));
}

#[tokio::test]
async fn test_same_reference_different_direction_is_not_a_duplicate() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let reference = Reference::new(ReferenceType::Invoice, "inv_9");

    h.service
        .credit(
            &h.ctx,
            CreditRequest::credits(wallet.id, dec!(10), TransactionReason::CreditNote)
                .with_reference(reference.clone()),
        )
        .await
        .unwrap();
    h.service
        .debit(
            &h.ctx,
            DebitRequest::credits(wallet.id, dec!(10), TransactionReason::InvoicePayment)
                .with_reference(reference),
        )
        .await
        .unwrap();

    assert_eq!(h.repo.entries(wallet.id).len(), 2);
    assert_eq!(h.credit_balance(wallet.id).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_credit_with_past_expiry_rejected() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let request = CreditRequest::credits(wallet.id, dec!(5), TransactionReason::FreeCredit)
        .expiring_at(start() - Duration::days(1));

    let err = h.service.credit(&h.ctx, request).await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidExpiryDate(_)));
}

#[tokio::test]
async fn test_credit_replay_after_expiry_returns_recorded_entry() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let request = CreditRequest::credits(wallet.id, dec!(15), TransactionReason::CreditNote)
        .with_reference(Reference::new(ReferenceType::Invoice, "inv_1"))
        .expiring_at(start() + Duration::days(1));

    let first = h.service.credit(&h.ctx, request.clone()).await.unwrap();
    h.clock.advance(Duration::days(2));
    let replay = h.service.credit(&h.ctx, request).await.unwrap();

    assert_eq!(first.id, replay.id);
    assert_eq!(h.repo.entries(wallet.id).len(), 1);
    assert_eq!(h.credit_balance(wallet.id).await, dec!(15));
}

#[tokio::test]
async fn test_debit_replay_on_frozen_wallet_returns_recorded_entry() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    h.credit(wallet.id, dec!(20), None).await;
    let request = DebitRequest::credits(wallet.id, dec!(5), TransactionReason::InvoicePayment)
        .with_reference(Reference::new(ReferenceType::Invoice, "inv_3"));

    let first = h.service.debit(&h.ctx, request.clone()).await.unwrap();
    h.service.freeze_wallet(&h.ctx, wallet.id).await.unwrap();
    let replay = h.service.debit(&h.ctx, request).await.unwrap();

    assert_eq!(first.id, replay.id);
    assert_eq!(h.credit_balance(wallet.id).await, dec!(15));
}

#[tokio::test]
async fn test_oversized_credit_rejected() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let huge = dec!(50000000000000000000000000000);

    for _ in 0..2 {
        let err = h
            .service
            .credit(
                &h.ctx,
                CreditRequest::credits(wallet.id, huge, TransactionReason::FreeCredit),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
    }

    assert!(h.repo.entries(wallet.id).is_empty());
    assert_eq!(h.credit_balance(wallet.id).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_credit_beyond_storable_balance_writes_nothing() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let largest = dec!(99999999999);
    h.credit(wallet.id, largest, None).await;

    let err = h
        .service
        .credit(
            &h.ctx,
            CreditRequest::credits(wallet.id, largest, TransactionReason::FreeCredit),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::InvalidAmount(_)));
    assert_eq!(h.repo.entries(wallet.id).len(), 1);
    assert_eq!(h.credit_balance(wallet.id).await, largest);
}

#[tokio::test]
async fn test_currency_amounts_convert_at_wallet_rate() {
    let h = Harness::new();
    let mut input = CreateWalletInput::prepaid(CustomerId::new(), "eur");
    input.conversion_rate = dec!(0.5);
    let wallet = h.service.create_wallet(&h.ctx, input).await.unwrap();
    assert_eq!(wallet.currency, "EUR");

    let mut request = CreditRequest::credits(wallet.id, Decimal::ZERO, TransactionReason::FreeCredit);
    request.amount = OperationAmount::Currency(dec!(10));
    let credit = h.service.credit(&h.ctx, request).await.unwrap();

    assert_eq!(credit.credit_amount, dec!(20));
    assert_eq!(credit.amount, dec!(10));
    assert_eq!(credit.conversion_rate, dec!(0.5));

    let wallet = h.service.get_wallet(&h.ctx, wallet.id).await.unwrap();
    assert_eq!(wallet.credit_balance, dec!(20));
    assert_eq!(wallet.balance, dec!(10));
}

// ========== Expiry & Breakage ==========

#[tokio::test]
async fn test_expired_credit_is_not_spendable() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let expiry = start() + Duration::days(1);
    h.credit(wallet.id, dec!(100), Some(expiry)).await;

    h.clock.set(expiry + Duration::seconds(1));

    let err = h.debit(wallet.id, dec!(10)).await.unwrap_err();
    assert!(matches!(
        err,
        WalletError::InsufficientBalance { available, .. } if available == Decimal::ZERO
    ));

    let real_time = h
        .service
        .compute_real_time_balance(&h.ctx, wallet.id)
        .await
        .unwrap();
    assert_eq!(real_time, Decimal::ZERO);
    assert_eq!(h.credit_balance(wallet.id).await, dec!(100));

    let report = h.service.reconcile(&h.ctx, wallet.id).await.unwrap();
    assert_eq!(report.breakage, dec!(100));
    assert_eq!(report.expired_unspent_entries.len(), 1);
    assert!(report.ledger.is_consistent());
}

#[tokio::test]
async fn test_credit_spendable_at_exact_expiry_instant() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let expiry = start() + Duration::days(1);
    h.credit(wallet.id, dec!(10), Some(expiry)).await;

    h.clock.set(expiry);
    assert!(h.debit(wallet.id, dec!(10)).await.is_ok());
}

#[tokio::test]
async fn test_expire_credits_writes_off_remaining_value() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let expiry = start() + Duration::days(7);
    let credit = h.credit(wallet.id, dec!(40), Some(expiry)).await;
    h.debit(wallet.id, dec!(15)).await.unwrap();

    let early = h.service.expire_credits(&h.ctx, credit.id).await.unwrap_err();
    assert!(matches!(early, WalletError::CreditNotExpirable { .. }));

    h.clock.advance(Duration::days(8));
    let write_off = h.service.expire_credits(&h.ctx, credit.id).await.unwrap();

    assert_eq!(write_off.transaction_type, TransactionType::Debit);
    assert_eq!(write_off.reason, TransactionReason::CreditExpired);
    assert_eq!(write_off.credit_amount, dec!(25));
    assert_eq!(write_off.reference.reference_id, credit.id.to_string());
    assert_eq!(h.available(credit.id).await, Decimal::ZERO);
    assert_eq!(h.credit_balance(wallet.id).await, Decimal::ZERO);

    let again = h.service.expire_credits(&h.ctx, credit.id).await.unwrap();
    assert_eq!(again.id, write_off.id);

    let report = h.service.reconcile(&h.ctx, wallet.id).await.unwrap();
    assert_eq!(report.breakage, Decimal::ZERO);
    assert!(report.ledger.is_consistent());

    let summary = h
        .service
        .breakage_in_period(&h.ctx, wallet.id, start(), start() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(summary.unrecorded, Decimal::ZERO);
    assert_eq!(summary.recorded, dec!(25));
}

#[tokio::test]
async fn test_expire_credits_rejects_debits_and_unknown_entries() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    h.credit(wallet.id, dec!(10), None).await;
    let debit = h.debit(wallet.id, dec!(5)).await.unwrap();

    let err = h.service.expire_credits(&h.ctx, debit.id).await.unwrap_err();
    assert!(matches!(err, WalletError::CreditNotExpirable { .. }));

    let err = h
        .service
        .expire_credits(&h.ctx, WalletTransactionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::TransactionNotFound(_)));
}

// ========== Consumption Engine ==========

#[tokio::test]
async fn test_selection_order_same_expiry_larger_first() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let t1 = start() + Duration::days(10);
    let t2 = start() + Duration::days(20);
    let e1 = h.credit(wallet.id, dec!(5), Some(t1)).await;
    let e2 = h.credit(wallet.id, dec!(10), Some(t1)).await;
    h.credit(wallet.id, dec!(100), Some(t2)).await;

    for page_size in [1, 2, 100] {
        let mut uow = h.repo.begin(&h.ctx, wallet.id).await.unwrap();
        let selected = CreditConsumer::new(page_size)
            .find_eligible_credits(&mut uow, dec!(12), start())
            .await
            .unwrap();

        let ids: Vec<_> = selected.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![e2.id, e1.id], "page size {page_size}");
    }
}

#[tokio::test]
async fn test_selection_returns_everything_when_short() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    for _ in 0..5 {
        h.credit(wallet.id, dec!(3), None).await;
    }

    let mut uow = h.repo.begin(&h.ctx, wallet.id).await.unwrap();
    let selected = CreditConsumer::new(2)
        .find_eligible_credits(&mut uow, dec!(100), start())
        .await
        .unwrap();
    assert_eq!(selected.len(), 5);
}

#[tokio::test]
async fn test_find_eligible_credits_rejects_non_positive_requirement() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let mut uow = h.repo.begin(&h.ctx, wallet.id).await.unwrap();

    let err = CreditConsumer::new(10)
        .find_eligible_credits(&mut uow, Decimal::ZERO, start())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_debit_spanning_many_pages() {
    let h = Harness::with_settings(WalletSettings {
        credit_page_size: 3,
        ..WalletSettings::default()
    });
    let wallet = h.wallet().await;
    for _ in 0..10 {
        h.credit(wallet.id, dec!(1), None).await;
    }

    h.debit(wallet.id, dec!(8)).await.unwrap();

    let remaining: Decimal = h
        .repo
        .entries(wallet.id)
        .iter()
        .filter(|e| e.transaction_type == TransactionType::Credit)
        .map(|e| e.credits_available)
        .sum();
    assert_eq!(remaining, dec!(2));
    assert_eq!(h.credit_balance(wallet.id).await, dec!(2));
}

// ========== Concurrency ==========

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overspend() {
    let h = Arc::new(Harness::new());
    let wallet = h.wallet().await;
    for _ in 0..10 {
        h.credit(wallet.id, dec!(10), None).await;
    }

    let n = 20;
    let barrier = Arc::new(Barrier::new(n));
    let debits = (0..n).map(|_| {
        let h = Arc::clone(&h);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            h.debit(wallet.id, dec!(10)).await
        })
    });
    let results: Vec<_> = join_all(debits).await.into_iter().map(Result::unwrap).collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(WalletError::InsufficientBalance { .. })))
        .count();
    assert_eq!(succeeded, 10);
    assert_eq!(insufficient, 10);
    assert_eq!(h.credit_balance(wallet.id).await, Decimal::ZERO);

    let report = h.service.reconcile(&h.ctx, wallet.id).await.unwrap();
    assert_eq!(report.real_time_credit_balance, Decimal::ZERO);
    assert!(report.ledger.is_consistent());
}

#[tokio::test]
async fn test_conflicts_are_retried() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    h.credit(wallet.id, dec!(10), None).await;

    h.repo.inject_conflicts(2);
    let debit = h.debit(wallet.id, dec!(4)).await.unwrap();

    assert_eq!(debit.credit_balance_after, dec!(6));
    assert_eq!(h.credit_balance(wallet.id).await, dec!(6));
}

#[tokio::test]
async fn test_persistent_conflicts_exhaust_retries_without_writes() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let credit = h.credit(wallet.id, dec!(10), None).await;

    h.repo.inject_conflicts(100);
    let err = h.debit(wallet.id, dec!(4)).await.unwrap_err();

    assert!(matches!(err, WalletError::RetriesExhausted { attempts: 4 }));
    assert_eq!(err.http_status_code(), 500);
    assert_eq!(h.available(credit.id).await, dec!(10));
    assert_eq!(h.credit_balance(wallet.id).await, dec!(10));
    h.repo.inject_conflicts(0);
}

// ========== Lifecycle ==========

#[tokio::test]
async fn test_status_lifecycle() {
    let h = Harness::new();
    let wallet = h.wallet().await;

    let frozen = h.service.freeze_wallet(&h.ctx, wallet.id).await.unwrap();
    assert_eq!(frozen.wallet_status, WalletStatus::Frozen);
    assert!(frozen.version > wallet.version);

    let err = h
        .service
        .credit(
            &h.ctx,
            CreditRequest::credits(wallet.id, dec!(1), TransactionReason::FreeCredit),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::WalletNotActive { .. }));

    h.service.unfreeze_wallet(&h.ctx, wallet.id).await.unwrap();
    h.service.close_wallet(&h.ctx, wallet.id).await.unwrap();

    let err = h
        .service
        .unfreeze_wallet(&h.ctx, wallet.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalletError::InvalidStatusTransition {
            from: WalletStatus::Closed,
            to: WalletStatus::Active,
        }
    ));
}

#[tokio::test]
async fn test_frozen_wallet_accepts_credit_when_configured() {
    let h = Harness::with_settings(WalletSettings {
        allow_credit_on_frozen: true,
        ..WalletSettings::default()
    });
    let wallet = h.wallet().await;
    h.service.freeze_wallet(&h.ctx, wallet.id).await.unwrap();

    h.credit(wallet.id, dec!(5), None).await;
    assert_eq!(h.credit_balance(wallet.id).await, dec!(5));
    assert!(h.debit(wallet.id, dec!(1)).await.is_err());
}

#[tokio::test]
async fn test_terminate_wallet_debits_spendable_and_closes() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    let expiry = start() + Duration::days(3);
    h.credit(wallet.id, dec!(50), Some(expiry)).await;
    h.credit(wallet.id, dec!(30), None).await;
    h.clock.set(expiry + Duration::days(1));

    let closed = h.service.terminate_wallet(&h.ctx, wallet.id).await.unwrap();

    assert_eq!(closed.wallet_status, WalletStatus::Closed);
    assert_eq!(closed.credit_balance, dec!(50));
    let termination = h
        .repo
        .entries(wallet.id)
        .into_iter()
        .find(|e| e.reason == TransactionReason::WalletTermination)
        .unwrap();
    assert_eq!(termination.credit_amount, dec!(30));

    let report = h.service.reconcile(&h.ctx, wallet.id).await.unwrap();
    assert_eq!(report.breakage, dec!(50));

    let err = h
        .service
        .terminate_wallet(&h.ctx, wallet.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidStatusTransition { .. }));
}

#[tokio::test]
async fn test_create_wallet_rejects_open_duplicate() {
    let h = Harness::new();
    let customer = CustomerId::new();
    let first = h
        .service
        .create_wallet(&h.ctx, CreateWalletInput::prepaid(customer, "USD"))
        .await
        .unwrap();

    let err = h
        .service
        .create_wallet(&h.ctx, CreateWalletInput::prepaid(customer, "usd"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::DuplicateWallet { .. }));

    h.service
        .create_wallet(&h.ctx, CreateWalletInput::prepaid(customer, "EUR"))
        .await
        .unwrap();

    h.service.close_wallet(&h.ctx, first.id).await.unwrap();
    h.service
        .create_wallet(&h.ctx, CreateWalletInput::prepaid(customer, "USD"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_wallet_with_initial_credits() {
    let h = Harness::new();
    let mut input = CreateWalletInput::prepaid(CustomerId::new(), "USD");
    input.initial_credits = Some(InitialCredits {
        credit_amount: dec!(15),
        expiry_date: Some(start() + Duration::days(90)),
    });

    let wallet = h.service.create_wallet(&h.ctx, input).await.unwrap();

    assert_eq!(wallet.credit_balance, dec!(15));
    let entries = h.repo.entries(wallet.id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, TransactionReason::FreeCredit);
}

#[tokio::test]
async fn test_create_wallet_validation() {
    let h = Harness::new();

    let mut bad_rate = CreateWalletInput::prepaid(CustomerId::new(), "USD");
    bad_rate.conversion_rate = Decimal::ZERO;
    assert!(matches!(
        h.service.create_wallet(&h.ctx, bad_rate).await,
        Err(WalletError::InvalidAmount(_))
    ));

    let bad_currency = CreateWalletInput::prepaid(CustomerId::new(), "dollars");
    assert!(matches!(
        h.service.create_wallet(&h.ctx, bad_currency).await,
        Err(WalletError::InvalidWallet(_))
    ));

    let mut topup = CreateWalletInput::prepaid(CustomerId::new(), "USD");
    topup.auto_topup_trigger = AutoTopupTrigger::BalanceBelowThreshold;
    assert!(matches!(
        h.service.create_wallet(&h.ctx, topup).await,
        Err(WalletError::InvalidWallet(_))
    ));

    let mut bad_initial = CreateWalletInput::prepaid(CustomerId::new(), "USD");
    bad_initial.initial_credits = Some(InitialCredits {
        credit_amount: dec!(-5),
        expiry_date: None,
    });
    assert!(matches!(
        h.service.create_wallet(&h.ctx, bad_initial).await,
        Err(WalletError::InvalidAmount(_))
    ));

    let listed = h
        .service
        .list_wallets(&h.ctx, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.meta.total, 0);
}

// ========== Queries ==========

#[tokio::test]
async fn test_list_transactions_filters_and_paginates() {
    let h = Harness::new();
    let wallet = h.wallet().await;
    for i in 0..5 {
        h.clock.advance(Duration::minutes(1));
        h.credit(wallet.id, Decimal::from(i + 1), None).await;
    }
    h.clock.advance(Duration::minutes(1));
    h.debit(wallet.id, dec!(2)).await.unwrap();

    let mut filter = TransactionFilter::for_wallet(wallet.id);
    filter.transaction_type = Some(TransactionType::Credit);
    filter.sort = SortOrder::Asc;

    let page = h
        .service
        .list_transactions(&h.ctx, &filter, PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 5);
    assert_eq!(page.meta.total_pages, 3);
    let amounts: Vec<_> = page.data.iter().map(|t| t.credit_amount).collect();
    assert_eq!(amounts, vec![dec!(3), dec!(4)]);

    let debits = h
        .service
        .list_transactions(
            &h.ctx,
            &TransactionFilter {
                reason: Some(TransactionReason::InvoicePayment),
                ..TransactionFilter::for_wallet(wallet.id)
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(debits.data.len(), 1);

    let newest_first = h
        .service
        .list_transactions(&h.ctx, &TransactionFilter::for_wallet(wallet.id), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(newest_first.data[0].transaction_type, TransactionType::Debit);
}

#[tokio::test]
async fn test_auto_topup_threshold_visible_after_debit() {
    let h = Harness::new();
    let mut input = CreateWalletInput::prepaid(CustomerId::new(), "USD");
    input.auto_topup_trigger = AutoTopupTrigger::BalanceBelowThreshold;
    input.auto_topup_min_balance = Some(dec!(10));
    input.auto_topup_amount = Some(dec!(100));
    let wallet = h.service.create_wallet(&h.ctx, input).await.unwrap();
    h.credit(wallet.id, dec!(20), None).await;

    h.debit(wallet.id, dec!(15)).await.unwrap();

    let wallet = h.service.get_wallet(&h.ctx, wallet.id).await.unwrap();
    assert!(wallet.needs_auto_topup());
}
