//! Builders shared by the wallet unit tests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::RequestContext;
use tally_shared::types::{CustomerId, EnvironmentId, TenantId, UserId, WalletId};

use super::transaction::{EntryDraft, Reference, TransactionReason, WalletTransaction};
use super::types::{AutoTopupTrigger, Metadata, Wallet, WalletStatus, WalletType};

pub fn ctx() -> RequestContext {
    RequestContext::new(TenantId::new(), EnvironmentId::new(), UserId::new())
}

pub fn wallet_with_balance(credit_balance: Decimal) -> Wallet {
    let ctx = ctx();
    let now = Utc::now();
    Wallet {
        id: WalletId::new(),
        tenant_id: ctx.tenant_id,
        environment_id: ctx.environment_id,
        customer_id: CustomerId::new(),
        name: "Test Wallet".into(),
        currency: "USD".into(),
        wallet_type: WalletType::Prepaid,
        description: None,
        metadata: Metadata::new(),
        balance: credit_balance,
        credit_balance,
        conversion_rate: Decimal::ONE,
        wallet_status: WalletStatus::Active,
        auto_topup_trigger: AutoTopupTrigger::Disabled,
        auto_topup_min_balance: None,
        auto_topup_amount: None,
        version: 1,
        created_at: now,
        created_by: ctx.user_id,
        updated_at: now,
        updated_by: ctx.user_id,
    }
}

fn draft(credits: Decimal, reason: TransactionReason, expiry: Option<DateTime<Utc>>) -> EntryDraft {
    EntryDraft {
        amount: credits,
        credit_amount: credits,
        reference: Reference::request(),
        reason,
        expiry_date: expiry,
        description: None,
        metadata: Metadata::new(),
    }
}

/// A completed credit entry on a throwaway wallet.
pub fn credit_entry(credits: Decimal, expiry: Option<DateTime<Utc>>) -> WalletTransaction {
    let wallet = wallet_with_balance(Decimal::ZERO);
    WalletTransaction::new_credit(
        &ctx(),
        &wallet,
        draft(credits, TransactionReason::FreeCredit, expiry),
        Utc::now(),
    )
    .unwrap()
}

/// A completed debit entry on a throwaway wallet.
pub fn debit_entry(credits: Decimal) -> WalletTransaction {
    let wallet = wallet_with_balance(credits);
    WalletTransaction::new_debit(
        &ctx(),
        &wallet,
        draft(credits, TransactionReason::InvoicePayment, None),
        Utc::now(),
    )
    .unwrap()
}
