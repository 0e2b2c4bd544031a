//! Balance reconciliation.
//!
//! The cached `credit_balance` on a wallet only moves through ledger writes,
//! but expiry happens silently: a credit whose expiry passes stops being
//! spendable without any entry being written. The difference between the
//! cached balance and the spendable sum is breakage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{WalletId, WalletTransactionId};

use super::conversion::credits_to_currency;
use super::error::WalletError;
use super::transaction::{TransactionReason, TransactionStatus, TransactionType, WalletTransaction};
use super::types::Wallet;

/// Sum of `credits_available` over entries spendable at `now`.
#[must_use]
pub fn real_time_credit_balance(entries: &[WalletTransaction], now: DateTime<Utc>) -> Decimal {
    entries
        .iter()
        .filter(|e| e.is_spendable_at(now))
        .map(|e| e.credits_available)
        .sum()
}

/// Breakage within a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreakageSummary {
    /// Unspent value of credits that expired in the period with no entry recording it.
    pub unrecorded: Decimal,
    /// Value written off in the period by `credit_expired` debits.
    pub recorded: Decimal,
}

impl BreakageSummary {
    /// Total breakage.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.unrecorded + self.recorded
    }
}

/// Breakage for expiries in `[start, end)` that have passed at `now`.
#[must_use]
pub fn breakage_in_period(
    entries: &[WalletTransaction],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> BreakageSummary {
    let in_period = |t: DateTime<Utc>| t >= start && t < end;

    let unrecorded = entries
        .iter()
        .filter(|e| e.is_completed_credit() && e.credits_available > Decimal::ZERO)
        .filter(|e| e.expiry_date.is_some_and(|x| in_period(x) && x < now))
        .map(|e| e.credits_available)
        .sum();

    let recorded = entries
        .iter()
        .filter(|e| {
            e.transaction_type == TransactionType::Debit
                && e.status == TransactionStatus::Completed
                && e.reason == TransactionReason::CreditExpired
                && in_period(e.created_at)
        })
        .map(|e| e.credit_amount)
        .sum();

    BreakageSummary {
        unrecorded,
        recorded,
    }
}

/// Whether the cached balance agrees with the ledger's credits and debits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConsistency {
    /// Σ completed credits − Σ completed debits.
    pub ledger_credit_balance: Decimal,
    /// The wallet's cached credit balance.
    pub cached_credit_balance: Decimal,
    /// `cached − ledger`; zero when consistent.
    pub drift: Decimal,
}

impl LedgerConsistency {
    /// Check a wallet against its completed entries.
    #[must_use]
    pub fn check(wallet: &Wallet, entries: &[WalletTransaction]) -> Self {
        let ledger_credit_balance: Decimal = entries
            .iter()
            .filter(|e| e.status == TransactionStatus::Completed)
            .map(|e| match e.transaction_type {
                TransactionType::Credit => e.credit_amount,
                TransactionType::Debit => -e.credit_amount,
            })
            .sum();

        Self {
            ledger_credit_balance,
            cached_credit_balance: wallet.credit_balance,
            drift: wallet.credit_balance - ledger_credit_balance,
        }
    }

    /// Returns true when there is no drift.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

/// Point-in-time balance report for one wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// The wallet.
    pub wallet_id: WalletId,
    /// Cached credit balance.
    pub cached_credit_balance: Decimal,
    /// Spendable credits at `as_of`.
    pub real_time_credit_balance: Decimal,
    /// Spendable value in currency at the wallet's rate.
    pub real_time_balance: Decimal,
    /// `cached − real_time`.
    pub breakage: Decimal,
    /// Credit entries expired with value left and no write-off recorded.
    pub expired_unspent_entries: Vec<WalletTransactionId>,
    /// Cached balance against the ledger.
    pub ledger: LedgerConsistency,
    /// Report instant.
    pub as_of: DateTime<Utc>,
}

impl BalanceReport {
    /// Build a report from a wallet and its completed entries.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the spendable balance cannot be converted to currency.
    pub fn build(
        wallet: &Wallet,
        entries: &[WalletTransaction],
        as_of: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        let real_time_credit_balance = real_time_credit_balance(entries, as_of);
        let expired_unspent_entries = entries
            .iter()
            .filter(|e| {
                e.is_completed_credit()
                    && e.credits_available > Decimal::ZERO
                    && e.is_expired_at(as_of)
            })
            .map(|e| e.id)
            .collect();

        let real_time_balance =
            credits_to_currency(real_time_credit_balance, wallet.conversion_rate)?;

        Ok(Self {
            wallet_id: wallet.id,
            cached_credit_balance: wallet.credit_balance,
            real_time_credit_balance,
            real_time_balance,
            breakage: wallet.credit_balance - real_time_credit_balance,
            expired_unspent_entries,
            ledger: LedgerConsistency::check(wallet, entries),
            as_of,
        })
    }
}
