//! Ledger entries (wallet transactions).
//!
//! A wallet's history is an append-only sequence of entries. Credit entries
//! carry a mutable `credits_available` that only ever decreases as the
//! consumption engine spends them; every other field is fixed at insert.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::RequestContext;
use tally_shared::types::{EnvironmentId, TenantId, UserId, WalletId, WalletTransactionId};

use super::error::WalletError;
use super::types::{Metadata, Wallet};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Adds credits.
    Credit,
    /// Removes credits.
    Debit,
}

impl TransactionType {
    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

/// Entry status. Only `completed` entries count toward balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled.
    Completed,
    /// Failed; never affects balances.
    Failed,
}

/// Why an entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionReason {
    /// Promotional grant.
    FreeCredit,
    /// Credits included with a subscription.
    SubscriptionCredit,
    /// Refund issued as credits.
    CreditNote,
    /// Purchase settled through an invoice.
    PurchasedCreditInvoiced,
    /// Purchase settled directly.
    PurchasedCreditDirect,
    /// Invoice paid from the wallet.
    InvoicePayment,
    /// Operator adjustment.
    ManualAdjustment,
    /// Expired value written off.
    CreditExpired,
    /// Remaining balance removed on termination.
    WalletTermination,
}

impl TransactionReason {
    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreeCredit => "free_credit",
            Self::SubscriptionCredit => "subscription_credit",
            Self::CreditNote => "credit_note",
            Self::PurchasedCreditInvoiced => "purchased_credit_invoiced",
            Self::PurchasedCreditDirect => "purchased_credit_direct",
            Self::InvoicePayment => "invoice_payment",
            Self::ManualAdjustment => "manual_adjustment",
            Self::CreditExpired => "credit_expired",
            Self::WalletTermination => "wallet_termination",
        }
    }
}

/// Kind of external object an entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// An invoice.
    Invoice,
    /// A payment.
    Payment,
    /// A subscription.
    Subscription,
    /// An identifier owned by the caller.
    External,
    /// Another wallet ledger entry.
    WalletTransaction,
    /// A one-off request; never deduplicated.
    Request,
}

impl ReferenceType {
    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Payment => "payment",
            Self::Subscription => "subscription",
            Self::External => "external",
            Self::WalletTransaction => "wallet_transaction",
            Self::Request => "request",
        }
    }
}

/// Reference from an entry to the object that caused it.
///
/// Two completed entries of the same type on the same wallet never share a
/// reference, unless the reference type is `request`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Kind of object.
    pub reference_type: ReferenceType,
    /// Its identifier.
    pub reference_id: String,
}

impl Reference {
    /// Creates a reference.
    #[must_use]
    pub fn new(reference_type: ReferenceType, reference_id: impl Into<String>) -> Self {
        Self {
            reference_type,
            reference_id: reference_id.into(),
        }
    }

    /// A fresh one-off request reference.
    #[must_use]
    pub fn request() -> Self {
        Self::new(ReferenceType::Request, uuid::Uuid::now_v7().to_string())
    }

    /// Returns true if the reference participates in idempotency checks.
    #[must_use]
    pub fn is_idempotent(&self) -> bool {
        self.reference_type != ReferenceType::Request
    }
}

/// A ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Entry ID.
    pub id: WalletTransactionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning tenant environment.
    pub environment_id: EnvironmentId,
    /// Wallet the entry belongs to.
    pub wallet_id: WalletId,
    /// Credit or debit.
    pub transaction_type: TransactionType,
    /// Currency amount at `conversion_rate`.
    pub amount: Decimal,
    /// Credit amount; positive.
    pub credit_amount: Decimal,
    /// Rate captured at write time.
    pub conversion_rate: Decimal,
    /// Unspent credits; meaningful for credit entries only.
    pub credits_available: Decimal,
    /// What caused the entry.
    pub reference: Reference,
    /// Why it was written.
    pub reason: TransactionReason,
    /// Settlement status.
    pub status: TransactionStatus,
    /// Instant after which the credits are no longer spendable.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Cached credit balance before the entry.
    pub credit_balance_before: Decimal,
    /// Cached credit balance after the entry.
    pub credit_balance_after: Decimal,
    /// Optional description.
    pub description: Option<String>,
    /// Arbitrary metadata.
    pub metadata: Metadata,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Creating user.
    pub created_by: UserId,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Last updating user.
    pub updated_by: UserId,
}

/// Caller-supplied parts of a new entry.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    /// Currency amount.
    pub amount: Decimal,
    /// Credit amount.
    pub credit_amount: Decimal,
    /// Reference.
    pub reference: Reference,
    /// Reason.
    pub reason: TransactionReason,
    /// Expiry (credits only).
    pub expiry_date: Option<DateTime<Utc>>,
    /// Description.
    pub description: Option<String>,
    /// Metadata.
    pub metadata: Metadata,
}

impl WalletTransaction {
    fn from_draft(
        ctx: &RequestContext,
        wallet: &Wallet,
        transaction_type: TransactionType,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        let (credits_available, credit_balance_after) = match transaction_type {
            TransactionType::Credit => (
                draft.credit_amount,
                wallet.credit_balance.checked_add(draft.credit_amount),
            ),
            TransactionType::Debit => (
                Decimal::ZERO,
                wallet.credit_balance.checked_sub(draft.credit_amount),
            ),
        };
        let credit_balance_after = credit_balance_after.ok_or_else(|| {
            WalletError::InvalidAmount(format!(
                "{} of {} credits overflows the balance of wallet {}",
                transaction_type.as_str(),
                draft.credit_amount,
                wallet.id
            ))
        })?;

        Ok(Self {
            id: WalletTransactionId::new(),
            tenant_id: wallet.tenant_id,
            environment_id: wallet.environment_id,
            wallet_id: wallet.id,
            transaction_type,
            amount: draft.amount,
            credit_amount: draft.credit_amount,
            conversion_rate: wallet.conversion_rate,
            credits_available,
            reference: draft.reference,
            reason: draft.reason,
            status: TransactionStatus::Completed,
            expiry_date: draft.expiry_date,
            credit_balance_before: wallet.credit_balance,
            credit_balance_after,
            description: draft.description,
            metadata: draft.metadata,
            created_at: now,
            created_by: ctx.user_id,
            updated_at: now,
            updated_by: ctx.user_id,
        })
    }

    /// Builds a completed credit entry against the wallet's current cached balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the resulting balance overflows.
    pub fn new_credit(
        ctx: &RequestContext,
        wallet: &Wallet,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        Self::from_draft(ctx, wallet, TransactionType::Credit, draft, now)
    }

    /// Builds a completed debit entry against the wallet's current cached balance.
    ///
    /// Debits never carry an expiry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the resulting balance overflows.
    pub fn new_debit(
        ctx: &RequestContext,
        wallet: &Wallet,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        let draft = EntryDraft {
            expiry_date: None,
            ..draft
        };
        Self::from_draft(ctx, wallet, TransactionType::Debit, draft, now)
    }

    /// Returns true for completed credit entries.
    #[must_use]
    pub fn is_completed_credit(&self) -> bool {
        self.transaction_type == TransactionType::Credit
            && self.status == TransactionStatus::Completed
    }

    /// Returns true if the entry's expiry has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < now)
    }

    /// Returns true if the entry can fund a debit at `now`.
    #[must_use]
    pub fn is_spendable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_completed_credit()
            && self.credits_available > Decimal::ZERO
            && !self.is_expired_at(now)
    }

    /// Credits already consumed from this entry.
    #[must_use]
    pub fn credits_consumed(&self) -> Decimal {
        self.credit_amount - self.credits_available
    }

    /// Returns true if the entry is visible to `ctx`.
    #[must_use]
    pub fn is_visible_to(&self, ctx: &RequestContext) -> bool {
        ctx.owns(self.tenant_id, self.environment_id)
    }
}

/// Spend order: earliest expiry first (no expiry last), then larger grants
/// first, then oldest first.
#[must_use]
pub fn spend_order(a: &WalletTransaction, b: &WalletTransaction) -> Ordering {
    let by_expiry = match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry
        .then_with(|| b.credit_amount.cmp(&a.credit_amount))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
