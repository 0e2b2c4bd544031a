//! Wallet service: the balance mutator and its administrative operations.
//!
//! Every mutation runs inside one [`WalletUnitOfWork`] opened on the target
//! wallet. The eligibility check, the credit draw-down, the ledger append and
//! the cached balance update either all commit or none do. Conflicting writes
//! (`ConcurrentModification`) are retried a bounded number of times.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::RequestContext;
use tally_shared::types::{PageRequest, PageResponse, WalletId, WalletTransactionId};
use tracing::{info, instrument, warn};

use super::consumption::{CreditConsumer, total_available};
use super::conversion::{self, OperationAmount, credits_to_currency};
use super::error::WalletError;
use super::filter::TransactionFilter;
use super::reconcile::{BalanceReport, BreakageSummary, breakage_in_period};
use super::repository::{WalletRepository, WalletUnitOfWork};
use super::transaction::{
    EntryDraft, Reference, ReferenceType, TransactionReason, TransactionType, WalletTransaction,
};
use super::types::{
    AutoTopupTrigger, CreateWalletInput, Metadata, Wallet, WalletSettings, WalletStatus,
};
use crate::clock::{Clock, SystemClock};

/// Input for a debit.
#[derive(Debug, Clone)]
pub struct DebitRequest {
    /// Wallet to debit.
    pub wallet_id: WalletId,
    /// Amount, in credits or currency.
    pub amount: OperationAmount,
    /// Why.
    pub reason: TransactionReason,
    /// Causal reference; repeated debits with the same reference are no-ops.
    pub reference: Option<Reference>,
    /// Description.
    pub description: Option<String>,
    /// Metadata.
    pub metadata: Metadata,
}

impl DebitRequest {
    /// A debit of `credits` with no reference.
    #[must_use]
    pub fn credits(wallet_id: WalletId, credits: Decimal, reason: TransactionReason) -> Self {
        Self {
            wallet_id,
            amount: OperationAmount::Credits(credits),
            reason,
            reference: None,
            description: None,
            metadata: Metadata::new(),
        }
    }

    /// Attach a causal reference.
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Input for a credit.
#[derive(Debug, Clone)]
pub struct CreditRequest {
    /// Wallet to credit.
    pub wallet_id: WalletId,
    /// Amount, in credits or currency.
    pub amount: OperationAmount,
    /// Why.
    pub reason: TransactionReason,
    /// Causal reference; repeated credits with the same reference are no-ops.
    pub reference: Option<Reference>,
    /// When the granted credits stop being spendable.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Description.
    pub description: Option<String>,
    /// Metadata.
    pub metadata: Metadata,
}

impl CreditRequest {
    /// A credit of `credits` with no reference and no expiry.
    #[must_use]
    pub fn credits(wallet_id: WalletId, credits: Decimal, reason: TransactionReason) -> Self {
        Self {
            wallet_id,
            amount: OperationAmount::Credits(credits),
            reason,
            reference: None,
            expiry_date: None,
            description: None,
            metadata: Metadata::new(),
        }
    }

    /// Attach a causal reference.
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Set the expiry of the granted credits.
    #[must_use]
    pub fn expiring_at(mut self, expiry_date: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }
}

/// Wallet service.
pub struct WalletService<R: WalletRepository> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    settings: WalletSettings,
    consumer: CreditConsumer,
}

impl<R: WalletRepository> WalletService<R> {
    /// Create a service reading wall-clock time.
    #[must_use]
    pub fn new(repo: Arc<R>, settings: WalletSettings) -> Self {
        Self::with_clock(repo, settings, Arc::new(SystemClock))
    }

    /// Create a service with an explicit time source.
    #[must_use]
    pub fn with_clock(repo: Arc<R>, settings: WalletSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            consumer: CreditConsumer::new(settings.credit_page_size),
            settings,
        }
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &WalletSettings {
        &self.settings
    }

    /// Run `attempt` until it succeeds, fails for good, or conflicts more than
    /// `max_retries` times.
    async fn with_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, WalletError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, WalletError>>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match attempt().await {
                Err(err) if err.is_retryable() => {
                    if attempts > self.settings.max_retries {
                        warn!(operation, attempts, error = %err, "giving up after repeated conflicts");
                        return Err(WalletError::RetriesExhausted { attempts });
                    }
                    warn!(operation, attempts, error = %err, "write conflict, retrying");
                }
                result => return result,
            }
        }
    }

    /// Append an entry built from the unit of work's wallet and move the cached balance with it.
    async fn append_entry<U: WalletUnitOfWork>(
        ctx: &RequestContext,
        uow: &mut U,
        transaction_type: TransactionType,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> Result<WalletTransaction, WalletError> {
        let wallet = uow.wallet().clone();
        let entry = match transaction_type {
            TransactionType::Credit => WalletTransaction::new_credit(ctx, &wallet, draft, now)?,
            TransactionType::Debit => WalletTransaction::new_debit(ctx, &wallet, draft, now)?,
        };

        let credit_balance = entry.credit_balance_after;
        if credit_balance < Decimal::ZERO {
            return Err(WalletError::InvariantViolation(format!(
                "cached credit balance of wallet {} would become {credit_balance}",
                wallet.id
            )));
        }
        let credit_balance = conversion::ensure_storable(credit_balance)?;
        let balance = conversion::ensure_storable(credits_to_currency(
            credit_balance,
            wallet.conversion_rate,
        )?)?;

        let entry = uow.insert_transaction(entry).await?;
        uow.update_wallet_balance(balance, credit_balance).await?;
        Ok(entry)
    }

    // ========== Balance Mutations ==========

    /// Debit a wallet, drawing from its eligible credits in spend order.
    ///
    /// A repeated idempotent reference returns the recorded debit before any other check.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound` / `WalletNotActive` for a missing or non-active wallet
    /// - `InvalidAmount` for a non-positive, over-precise or oversized amount
    /// - `InsufficientBalance` when eligible credits do not cover the amount; nothing is written
    /// - `RetriesExhausted` when conflicting writes persist
    #[instrument(skip(self, ctx, request), fields(wallet_id = %request.wallet_id, amount = ?request.amount, reason = request.reason.as_str()))]
    pub async fn debit(
        &self,
        ctx: &RequestContext,
        request: DebitRequest,
    ) -> Result<WalletTransaction, WalletError> {
        self.with_retries("debit", || self.try_debit(ctx, &request)).await
    }

    async fn try_debit(
        &self,
        ctx: &RequestContext,
        request: &DebitRequest,
    ) -> Result<WalletTransaction, WalletError> {
        let mut uow = self.repo.begin(ctx, request.wallet_id).await?;
        let wallet = uow.wallet().clone();

        if let Some(reference) = request.reference.as_ref().filter(|r| r.is_idempotent()) {
            if let Some(existing) = uow.find_by_reference(TransactionType::Debit, reference).await? {
                uow.rollback().await?;
                info!(transaction_id = %existing.id, "debit already recorded for reference");
                return Ok(existing);
            }
        }

        if !wallet.wallet_status.allows_debit() {
            return Err(WalletError::WalletNotActive {
                wallet_id: wallet.id,
                status: wallet.wallet_status,
            });
        }
        let resolved = request.amount.resolve(wallet.conversion_rate)?;

        let now = self.clock.now();
        let credits = self
            .consumer
            .find_eligible_credits(&mut uow, resolved.credit_amount, now)
            .await?;
        let available = total_available(&credits);
        if available < resolved.credit_amount {
            uow.rollback().await?;
            warn!(requested = %resolved.credit_amount, %available, "insufficient balance");
            return Err(WalletError::InsufficientBalance {
                wallet_id: wallet.id,
                requested: resolved.credit_amount,
                available,
            });
        }

        self.consumer
            .consume_credits(&mut uow, &credits, resolved.credit_amount)
            .await?;

        let draft = EntryDraft {
            amount: resolved.amount,
            credit_amount: resolved.credit_amount,
            reference: request.reference.clone().unwrap_or_else(Reference::request),
            reason: request.reason,
            expiry_date: None,
            description: request.description.clone(),
            metadata: request.metadata.clone(),
        };
        let entry = Self::append_entry(ctx, &mut uow, TransactionType::Debit, draft, now).await?;
        let needs_topup = uow.wallet().needs_auto_topup();
        uow.commit().await?;

        info!(
            transaction_id = %entry.id,
            credit_balance = %entry.credit_balance_after,
            "wallet debited"
        );
        if needs_topup {
            info!(credit_balance = %entry.credit_balance_after, "auto top-up threshold crossed");
        }
        Ok(entry)
    }

    /// Credit a wallet with a new grant.
    ///
    /// A repeated idempotent reference returns the recorded credit before any other check,
    /// so a retried grant whose expiry has since passed still resolves to the original entry.
    ///
    /// # Errors
    ///
    /// - `WalletNotFound` / `WalletNotActive` (closed, or frozen unless allowed by settings)
    /// - `InvalidAmount` for a non-positive, over-precise or oversized amount, or one that
    ///   would push the cached balance past what can be stored
    /// - `InvalidExpiryDate` for an expiry in the past
    #[instrument(skip(self, ctx, request), fields(wallet_id = %request.wallet_id, amount = ?request.amount, reason = request.reason.as_str()))]
    pub async fn credit(
        &self,
        ctx: &RequestContext,
        request: CreditRequest,
    ) -> Result<WalletTransaction, WalletError> {
        self.with_retries("credit", || self.try_credit(ctx, &request)).await
    }

    async fn try_credit(
        &self,
        ctx: &RequestContext,
        request: &CreditRequest,
    ) -> Result<WalletTransaction, WalletError> {
        let mut uow = self.repo.begin(ctx, request.wallet_id).await?;
        let wallet = uow.wallet().clone();

        if let Some(reference) = request.reference.as_ref().filter(|r| r.is_idempotent()) {
            if let Some(existing) = uow.find_by_reference(TransactionType::Credit, reference).await? {
                uow.rollback().await?;
                info!(transaction_id = %existing.id, "credit already recorded for reference");
                return Ok(existing);
            }
        }

        if !wallet
            .wallet_status
            .allows_credit(self.settings.allow_credit_on_frozen)
        {
            return Err(WalletError::WalletNotActive {
                wallet_id: wallet.id,
                status: wallet.wallet_status,
            });
        }
        let resolved = request.amount.resolve(wallet.conversion_rate)?;

        let now = self.clock.now();
        if let Some(expiry) = request.expiry_date.filter(|e| *e < now) {
            return Err(WalletError::InvalidExpiryDate(expiry));
        }

        let draft = EntryDraft {
            amount: resolved.amount,
            credit_amount: resolved.credit_amount,
            reference: request.reference.clone().unwrap_or_else(Reference::request),
            reason: request.reason,
            expiry_date: request.expiry_date,
            description: request.description.clone(),
            metadata: request.metadata.clone(),
        };
        let entry = Self::append_entry(ctx, &mut uow, TransactionType::Credit, draft, now).await?;
        uow.commit().await?;

        info!(
            transaction_id = %entry.id,
            credit_balance = %entry.credit_balance_after,
            "wallet credited"
        );
        Ok(entry)
    }

    /// Write off the unspent value of an expired credit entry.
    ///
    /// Zeroes the entry's `credits_available` and appends a `credit_expired`
    /// debit referencing it. Calling it again returns that debit.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` for an unknown entry
    /// - `CreditNotExpirable` if the entry is not a completed credit, has no expiry,
    ///   has not expired yet, or has nothing left
    /// - `WalletNotActive` if the wallet is closed
    #[instrument(skip(self, ctx))]
    pub async fn expire_credits(
        &self,
        ctx: &RequestContext,
        transaction_id: WalletTransactionId,
    ) -> Result<WalletTransaction, WalletError> {
        let entry = self
            .repo
            .get_transaction(ctx, transaction_id)
            .await?
            .ok_or(WalletError::TransactionNotFound(transaction_id))?;

        self.with_retries("expire_credits", || {
            self.try_expire_credits(ctx, entry.wallet_id, transaction_id)
        })
        .await
    }

    async fn try_expire_credits(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
    ) -> Result<WalletTransaction, WalletError> {
        let mut uow = self.repo.begin(ctx, wallet_id).await?;
        let wallet = uow.wallet().clone();
        if wallet.wallet_status.is_terminal() {
            return Err(WalletError::WalletNotActive {
                wallet_id,
                status: wallet.wallet_status,
            });
        }

        let reference = Reference::new(ReferenceType::WalletTransaction, transaction_id.to_string());
        if let Some(existing) = uow.find_by_reference(TransactionType::Debit, &reference).await? {
            uow.rollback().await?;
            return Ok(existing);
        }

        let credit = uow
            .lock_transaction(transaction_id)
            .await?
            .ok_or(WalletError::TransactionNotFound(transaction_id))?;
        let now = self.clock.now();
        let not_expirable = |reason| WalletError::CreditNotExpirable {
            transaction_id,
            reason,
        };
        if !credit.is_completed_credit() {
            return Err(not_expirable("not a completed credit"));
        }
        if credit.expiry_date.is_none() {
            return Err(not_expirable("no expiry date"));
        }
        if !credit.is_expired_at(now) {
            return Err(not_expirable("not expired yet"));
        }
        if credit.credits_available <= Decimal::ZERO {
            return Err(not_expirable("no credits left"));
        }

        let remaining = credit.credits_available;
        self.consumer
            .consume_credits(&mut uow, std::slice::from_ref(&credit), remaining)
            .await?;

        let draft = EntryDraft {
            amount: credits_to_currency(remaining, wallet.conversion_rate)?,
            credit_amount: remaining,
            reference,
            reason: TransactionReason::CreditExpired,
            expiry_date: None,
            description: Some(format!("Expired credits from {transaction_id}")),
            metadata: Metadata::new(),
        };
        let entry = Self::append_entry(ctx, &mut uow, TransactionType::Debit, draft, now).await?;
        uow.commit().await?;

        info!(transaction_id = %entry.id, expired = %remaining, "expired credits written off");
        Ok(entry)
    }

    // ========== Wallet Lifecycle ==========

    /// Create a wallet, optionally granting initial `free_credit` credits.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a non-positive conversion rate or initial amount
    /// - `InvalidWallet` for a malformed currency, name or auto top-up configuration
    /// - `DuplicateWallet` if the customer already has an open wallet of this currency and type
    #[instrument(skip(self, ctx, input), fields(customer_id = %input.customer_id, currency = %input.currency))]
    pub async fn create_wallet(
        &self,
        ctx: &RequestContext,
        input: CreateWalletInput,
    ) -> Result<Wallet, WalletError> {
        let now = self.clock.now();
        conversion::validate_rate(input.conversion_rate)?;

        let currency = input.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(WalletError::InvalidWallet(format!(
                "currency must be a 3-letter ISO code, got {:?}",
                input.currency
            )));
        }
        if input.name.trim().is_empty() {
            return Err(WalletError::InvalidWallet("name must not be empty".to_string()));
        }
        if input.auto_topup_trigger == AutoTopupTrigger::BalanceBelowThreshold {
            match (input.auto_topup_min_balance, input.auto_topup_amount) {
                (Some(min), Some(amount)) => {
                    if min < Decimal::ZERO {
                        return Err(WalletError::InvalidAmount(format!(
                            "auto top-up threshold must not be negative, got {min}"
                        )));
                    }
                    conversion::validate_amount(amount)?;
                }
                _ => {
                    return Err(WalletError::InvalidWallet(
                        "auto top-up needs a threshold and an amount".to_string(),
                    ));
                }
            }
        }
        if let Some(initial) = &input.initial_credits {
            conversion::validate_amount(initial.credit_amount)?;
            if let Some(expiry) = initial.expiry_date.filter(|e| *e < now) {
                return Err(WalletError::InvalidExpiryDate(expiry));
            }
        }

        let open_duplicate = self
            .repo
            .find_wallets_by_customer(ctx, input.customer_id)
            .await?
            .into_iter()
            .any(|w| {
                w.currency == currency
                    && w.wallet_type == input.wallet_type
                    && w.wallet_status != WalletStatus::Closed
            });
        if open_duplicate {
            return Err(WalletError::DuplicateWallet {
                customer_id: input.customer_id,
                currency,
            });
        }

        let wallet = Wallet {
            id: WalletId::new(),
            tenant_id: ctx.tenant_id,
            environment_id: ctx.environment_id,
            customer_id: input.customer_id,
            name: input.name.trim().to_string(),
            currency,
            wallet_type: input.wallet_type,
            description: input.description,
            metadata: input.metadata,
            balance: Decimal::ZERO,
            credit_balance: Decimal::ZERO,
            conversion_rate: input.conversion_rate,
            wallet_status: WalletStatus::Active,
            auto_topup_trigger: input.auto_topup_trigger,
            auto_topup_min_balance: input.auto_topup_min_balance,
            auto_topup_amount: input.auto_topup_amount,
            version: 1,
            created_at: now,
            created_by: ctx.user_id,
            updated_at: now,
            updated_by: ctx.user_id,
        };
        let wallet = self.repo.create_wallet(ctx, wallet).await?;
        info!(wallet_id = %wallet.id, "wallet created");

        let Some(initial) = input.initial_credits else {
            return Ok(wallet);
        };
        let mut request =
            CreditRequest::credits(wallet.id, initial.credit_amount, TransactionReason::FreeCredit);
        request.expiry_date = initial.expiry_date;
        request.description = Some("Initial wallet credits".to_string());
        self.credit(ctx, request).await?;

        self.get_wallet(ctx, wallet.id).await
    }

    /// Move a wallet to `status`.
    ///
    /// # Errors
    ///
    /// `InvalidStatusTransition` unless the lifecycle allows the change.
    #[instrument(skip(self, ctx))]
    pub async fn update_wallet_status(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
        status: WalletStatus,
    ) -> Result<Wallet, WalletError> {
        self.with_retries("update_wallet_status", || async move {
            let mut uow = self.repo.begin(ctx, wallet_id).await?;
            let from = uow.wallet().wallet_status;
            if !from.can_transition_to(status) {
                return Err(WalletError::InvalidStatusTransition { from, to: status });
            }
            let wallet = uow.update_wallet_status(status).await?;
            uow.commit().await?;
            info!(%from, to = %status, "wallet status changed");
            Ok(wallet)
        })
        .await
    }

    /// Freeze an active wallet.
    pub async fn freeze_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Wallet, WalletError> {
        self.update_wallet_status(ctx, wallet_id, WalletStatus::Frozen)
            .await
    }

    /// Reactivate a frozen wallet.
    pub async fn unfreeze_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Wallet, WalletError> {
        self.update_wallet_status(ctx, wallet_id, WalletStatus::Active)
            .await
    }

    /// Close a wallet without touching its balance. See also [`Self::terminate_wallet`].
    pub async fn close_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Wallet, WalletError> {
        self.update_wallet_status(ctx, wallet_id, WalletStatus::Closed)
            .await
    }

    /// Debit every spendable credit with reason `wallet_termination`, then close the wallet.
    ///
    /// Expired value is not debited; it stays visible as breakage.
    ///
    /// # Errors
    ///
    /// `InvalidStatusTransition` if the wallet is already closed.
    #[instrument(skip(self, ctx))]
    pub async fn terminate_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Wallet, WalletError> {
        self.with_retries("terminate_wallet", || self.try_terminate_wallet(ctx, wallet_id))
            .await
    }

    async fn try_terminate_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Wallet, WalletError> {
        let mut uow = self.repo.begin(ctx, wallet_id).await?;
        let wallet = uow.wallet().clone();
        if !wallet.wallet_status.can_transition_to(WalletStatus::Closed) {
            return Err(WalletError::InvalidStatusTransition {
                from: wallet.wallet_status,
                to: WalletStatus::Closed,
            });
        }

        let now = self.clock.now();
        let credits = self.consumer.all_eligible_credits(&mut uow, now).await?;
        let remaining = total_available(&credits);
        if remaining > Decimal::ZERO {
            self.consumer
                .consume_credits(&mut uow, &credits, remaining)
                .await?;
            let draft = EntryDraft {
                amount: credits_to_currency(remaining, wallet.conversion_rate)?,
                credit_amount: remaining,
                reference: Reference::request(),
                reason: TransactionReason::WalletTermination,
                expiry_date: None,
                description: Some("Wallet termination".to_string()),
                metadata: Metadata::new(),
            };
            Self::append_entry(ctx, &mut uow, TransactionType::Debit, draft, now).await?;
        }

        let closed = uow.update_wallet_status(WalletStatus::Closed).await?;
        uow.commit().await?;
        info!(debited = %remaining, "wallet terminated");
        Ok(closed)
    }

    // ========== Queries ==========

    /// Get a wallet.
    pub async fn get_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Wallet, WalletError> {
        self.repo
            .get_wallet(ctx, wallet_id)
            .await?
            .ok_or(WalletError::WalletNotFound(wallet_id))
    }

    /// List wallets of the context's environment.
    pub async fn list_wallets(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<PageResponse<Wallet>, WalletError> {
        self.repo.list_wallets(ctx, page).await
    }

    /// Get a ledger entry.
    pub async fn get_transaction(
        &self,
        ctx: &RequestContext,
        transaction_id: WalletTransactionId,
    ) -> Result<WalletTransaction, WalletError> {
        self.repo
            .get_transaction(ctx, transaction_id)
            .await?
            .ok_or(WalletError::TransactionNotFound(transaction_id))
    }

    /// List ledger entries.
    pub async fn list_transactions(
        &self,
        ctx: &RequestContext,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, WalletError> {
        self.repo.list_transactions(ctx, filter, page).await
    }

    // ========== Reconciliation ==========

    /// Spendable credits right now. Read-only.
    pub async fn compute_real_time_balance(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Decimal, WalletError> {
        let wallet = self.get_wallet(ctx, wallet_id).await?;
        self.repo
            .sum_spendable_credits(ctx, wallet.id, self.clock.now())
            .await
    }

    /// Full balance report for a wallet. Read-only.
    pub async fn reconcile(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<BalanceReport, WalletError> {
        let wallet = self.get_wallet(ctx, wallet_id).await?;
        let entries = self.repo.list_completed_entries(ctx, wallet_id).await?;
        BalanceReport::build(&wallet, &entries, self.clock.now())
    }

    /// Breakage for expiries in `[start, end)`. Read-only.
    pub async fn breakage_in_period(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BreakageSummary, WalletError> {
        self.get_wallet(ctx, wallet_id).await?;
        let entries = self.repo.list_completed_entries(ctx, wallet_id).await?;
        Ok(breakage_in_period(&entries, start, end, self.clock.now()))
    }
}
