//! Ledger entry filtering for `list_transactions`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::WalletId;

use super::transaction::{
    Reference, TransactionReason, TransactionStatus, TransactionType, WalletTransaction,
};

/// Sort direction on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

/// Filter over ledger entries. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Restrict to one wallet.
    pub wallet_id: Option<WalletId>,
    /// Restrict to credits or debits.
    pub transaction_type: Option<TransactionType>,
    /// Restrict to a status.
    pub status: Option<TransactionStatus>,
    /// Restrict to a reason.
    pub reason: Option<TransactionReason>,
    /// Restrict to a reference.
    pub reference: Option<Reference>,
    /// Created at or after.
    pub created_after: Option<DateTime<Utc>>,
    /// Created strictly before.
    pub created_before: Option<DateTime<Utc>>,
    /// Expiring at or after.
    pub expiry_after: Option<DateTime<Utc>>,
    /// Expiring strictly before.
    pub expiry_before: Option<DateTime<Utc>>,
    /// Only entries with more than this many credits available.
    pub credits_available_gt: Option<Decimal>,
    /// Sort direction.
    pub sort: SortOrder,
}

impl TransactionFilter {
    /// Filter for one wallet's entries.
    #[must_use]
    pub fn for_wallet(wallet_id: WalletId) -> Self {
        Self {
            wallet_id: Some(wallet_id),
            ..Self::default()
        }
    }

    /// Returns true if `tx` passes the filter.
    #[must_use]
    pub fn matches(&self, tx: &WalletTransaction) -> bool {
        self.wallet_id.is_none_or(|id| tx.wallet_id == id)
            && self.transaction_type.is_none_or(|t| tx.transaction_type == t)
            && self.status.is_none_or(|s| tx.status == s)
            && self.reason.is_none_or(|r| tx.reason == r)
            && self.reference.as_ref().is_none_or(|r| &tx.reference == r)
            && self.created_after.is_none_or(|t| tx.created_at >= t)
            && self.created_before.is_none_or(|t| tx.created_at < t)
            && self
                .expiry_after
                .is_none_or(|t| tx.expiry_date.is_some_and(|e| e >= t))
            && self
                .expiry_before
                .is_none_or(|t| tx.expiry_date.is_some_and(|e| e < t))
            && self
                .credits_available_gt
                .is_none_or(|min| tx.credits_available > min)
    }
}
