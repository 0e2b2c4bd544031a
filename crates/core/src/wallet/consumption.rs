//! Credit Consumption Engine.
//!
//! Selects which credit entries fund a debit and draws them down:
//!
//! 1. [`CreditConsumer::find_eligible_credits`] pages through spendable credits in
//!    spend order (earliest expiry, then largest grant) until the running sum
//!    covers the requested amount or the ledger runs out.
//! 2. [`CreditConsumer::consume_credits`] walks the selection and takes
//!    `min(remaining, available)` from each entry with a conditional write.
//!
//! Both steps run inside the caller's unit of work, so the selection stays
//! valid until the debit commits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::WalletTransactionId;
use tracing::debug;

use super::error::WalletError;
use super::repository::WalletUnitOfWork;
use super::transaction::WalletTransaction;

/// How much one credit entry contributes to a debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The credit entry.
    pub transaction_id: WalletTransactionId,
    /// `credits_available` before the debit.
    pub available_before: Decimal,
    /// Credits taken.
    pub consumed: Decimal,
}

impl Allocation {
    /// `credits_available` after the debit.
    #[must_use]
    pub fn available_after(&self) -> Decimal {
        self.available_before - self.consumed
    }
}

/// Sum of `credits_available` over `credits`.
#[must_use]
pub fn total_available(credits: &[WalletTransaction]) -> Decimal {
    credits.iter().map(|c| c.credits_available).sum()
}

/// Plans how `amount` is drawn from `credits`, in the given order.
///
/// Each entry gives `min(remaining, available)`; entries with nothing
/// available are skipped and the walk stops once `amount` is covered. If the
/// credits do not cover `amount`, the plan drains all of them.
#[must_use]
pub fn plan_allocations(credits: &[WalletTransaction], amount: Decimal) -> Vec<Allocation> {
    let mut remaining = amount;
    let mut plan = Vec::new();

    for credit in credits {
        if remaining <= Decimal::ZERO {
            break;
        }
        if credit.credits_available <= Decimal::ZERO {
            continue;
        }

        let consumed = remaining.min(credit.credits_available);
        plan.push(Allocation {
            transaction_id: credit.id,
            available_before: credit.credits_available,
            consumed,
        });
        remaining -= consumed;
    }

    plan
}

/// The consumption engine.
#[derive(Debug, Clone, Copy)]
pub struct CreditConsumer {
    page_size: u64,
}

impl CreditConsumer {
    /// Create an engine fetching `page_size` entries per page (at least 1).
    #[must_use]
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Page size in use.
    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Select spendable credits, in spend order, until their sum reaches `required`.
    ///
    /// Returns the shortest prefix of the spend order whose sum is at least
    /// `required`, or every spendable credit if the ledger cannot cover it.
    /// Entries expired at `now` are never returned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if `required` is not positive, or the unit of
    /// work's storage error.
    pub async fn find_eligible_credits<U: WalletUnitOfWork>(
        &self,
        uow: &mut U,
        required: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        if required <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount(format!(
                "required amount must be positive, got {required}"
            )));
        }
        self.collect(uow, Some(required), now).await
    }

    /// Every spendable credit at `now`, in spend order.
    ///
    /// # Errors
    ///
    /// Returns the unit of work's storage error.
    pub async fn all_eligible_credits<U: WalletUnitOfWork>(
        &self,
        uow: &mut U,
        now: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        self.collect(uow, None, now).await
    }

    async fn collect<U: WalletUnitOfWork>(
        &self,
        uow: &mut U,
        required: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let mut selected = Vec::new();
        let mut running = Decimal::ZERO;
        let mut offset = 0;

        loop {
            let page = uow.eligible_credits_page(now, offset, self.page_size).await?;
            let fetched = page.len() as u64;

            for credit in page {
                // Expired or drained entries are never selected.
                if !credit.is_spendable_at(now) {
                    continue;
                }
                running += credit.credits_available;
                selected.push(credit);

                if required.is_some_and(|r| running >= r) {
                    debug!(
                        wallet_id = %uow.wallet().id,
                        entries = selected.len(),
                        %running,
                        "eligible credits cover required amount"
                    );
                    return Ok(selected);
                }
            }

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        debug!(
            wallet_id = %uow.wallet().id,
            entries = selected.len(),
            %running,
            "eligible credits exhausted"
        );
        Ok(selected)
    }

    /// Draw `amount` from `credits`, in order, writing each entry's new
    /// `credits_available` through the unit of work.
    ///
    /// Returns the allocations written. The caller checks coverage first; if
    /// `credits` fall short the shortfall is simply left undrawn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a non-positive amount, `ConcurrentModification`
    /// if an entry no longer holds the value it was selected with, or the unit of
    /// work's storage error.
    pub async fn consume_credits<U: WalletUnitOfWork>(
        &self,
        uow: &mut U,
        credits: &[WalletTransaction],
        amount: Decimal,
    ) -> Result<Vec<Allocation>, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount(format!(
                "consumed amount must be positive, got {amount}"
            )));
        }

        let plan = plan_allocations(credits, amount);
        for allocation in &plan {
            uow.set_credits_available(
                allocation.transaction_id,
                allocation.available_before,
                allocation.available_after(),
            )
            .await?;
        }

        debug!(
            wallet_id = %uow.wallet().id,
            entries = plan.len(),
            %amount,
            "credits consumed"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::wallet::test_support::credit_entry;

    #[test]
    fn test_plan_takes_min_of_remaining_and_available() {
        let a = credit_entry(dec!(30), None);
        let b = credit_entry(dec!(50), None);
        let plan = plan_allocations(&[a.clone(), b.clone()], dec!(60));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].transaction_id, a.id);
        assert_eq!(plan[0].consumed, dec!(30));
        assert_eq!(plan[0].available_after(), Decimal::ZERO);
        assert_eq!(plan[1].consumed, dec!(30));
        assert_eq!(plan[1].available_after(), dec!(20));
    }

    #[test]
    fn test_plan_stops_once_covered() {
        let a = credit_entry(dec!(30), None);
        let b = credit_entry(dec!(50), None);
        let plan = plan_allocations(&[a, b], dec!(10));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].consumed, dec!(10));
    }

    #[test]
    fn test_plan_skips_empty_entries() {
        let mut empty = credit_entry(dec!(30), None);
        empty.credits_available = Decimal::ZERO;
        let b = credit_entry(dec!(50), None);
        let plan = plan_allocations(&[empty, b.clone()], dec!(10));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].transaction_id, b.id);
    }

    #[test]
    fn test_total_available() {
        let credits = vec![credit_entry(dec!(1.5), None), credit_entry(dec!(2.25), None)];
        assert_eq!(total_available(&credits), dec!(3.75));
        assert_eq!(total_available(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_page_size_is_at_least_one() {
        assert_eq!(CreditConsumer::new(0).page_size(), 1);
        assert_eq!(CreditConsumer::new(100).page_size(), 100);
    }
}
