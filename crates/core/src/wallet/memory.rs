//! In-memory wallet repository.
//!
//! Mirrors the guarantees of the PostgreSQL repository: a per-wallet async
//! mutex stands in for `SELECT ... FOR UPDATE`, writes are staged in the unit
//! of work and applied under one store lock on commit, and conditional writes
//! fail with `ConcurrentModification` exactly where the SQL ones would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::RequestContext;
use tally_shared::types::{
    CustomerId, PageRequest, PageResponse, WalletId, WalletTransactionId,
};
use tokio::sync::OwnedMutexGuard;

use super::error::WalletError;
use super::filter::{SortOrder, TransactionFilter};
use super::repository::{WalletRepository, WalletUnitOfWork};
use super::transaction::{
    Reference, TransactionStatus, TransactionType, WalletTransaction, spend_order,
};
use super::types::{Wallet, WalletStatus};

#[derive(Debug, Default)]
struct Store {
    wallets: HashMap<WalletId, Wallet>,
    transactions: HashMap<WalletTransactionId, WalletTransaction>,
}

impl Store {
    fn wallet_entries(&self, wallet_id: WalletId) -> impl Iterator<Item = &WalletTransaction> {
        self.transactions
            .values()
            .filter(move |tx| tx.wallet_id == wallet_id)
    }
}

#[derive(Debug, Default)]
struct Inner {
    store: Mutex<Store>,
    wallet_locks: Mutex<HashMap<WalletId, Arc<tokio::sync::Mutex<()>>>>,
    injected_conflicts: AtomicU32,
}

impl Inner {
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wallet_lock(&self, wallet_id: WalletId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .wallet_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(wallet_id).or_default())
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Wallet repository backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWalletRepository {
    inner: Arc<Inner>,
}

impl InMemoryWalletRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` conditional credit writes fail with `ConcurrentModification`.
    pub fn inject_conflicts(&self, count: u32) {
        self.inner.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Every entry of a wallet regardless of status, oldest first.
    #[must_use]
    pub fn entries(&self, wallet_id: WalletId) -> Vec<WalletTransaction> {
        let mut entries: Vec<_> = self.inner.store().wallet_entries(wallet_id).cloned().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        entries
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let data = items.into_iter().skip(offset).take(limit).collect();
    PageResponse::new(data, page.page, page.per_page, total)
}

fn visible_wallet(store: &Store, ctx: &RequestContext, wallet_id: WalletId) -> Option<Wallet> {
    store
        .wallets
        .get(&wallet_id)
        .filter(|w| w.is_visible_to(ctx))
        .cloned()
}

impl WalletRepository for InMemoryWalletRepository {
    type UnitOfWork = InMemoryUnitOfWork;

    async fn create_wallet(
        &self,
        ctx: &RequestContext,
        wallet: Wallet,
    ) -> Result<Wallet, WalletError> {
        if !wallet.is_visible_to(ctx) {
            return Err(WalletError::InvalidWallet(
                "wallet belongs to another tenant or environment".to_string(),
            ));
        }

        let mut store = self.inner.store();
        let duplicate = store.wallets.values().any(|w| {
            w.is_visible_to(ctx)
                && w.customer_id == wallet.customer_id
                && w.currency == wallet.currency
                && w.wallet_type == wallet.wallet_type
                && w.wallet_status != WalletStatus::Closed
        });
        if duplicate {
            return Err(WalletError::DuplicateWallet {
                customer_id: wallet.customer_id,
                currency: wallet.currency,
            });
        }

        store.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn get_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>, WalletError> {
        Ok(visible_wallet(&self.inner.store(), ctx, wallet_id))
    }

    async fn find_wallets_by_customer(
        &self,
        ctx: &RequestContext,
        customer_id: CustomerId,
    ) -> Result<Vec<Wallet>, WalletError> {
        let store = self.inner.store();
        let mut wallets: Vec<_> = store
            .wallets
            .values()
            .filter(|w| w.is_visible_to(ctx) && w.customer_id == customer_id)
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(wallets)
    }

    async fn list_wallets(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<PageResponse<Wallet>, WalletError> {
        let mut wallets: Vec<_> = self
            .inner
            .store()
            .wallets
            .values()
            .filter(|w| w.is_visible_to(ctx))
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(wallets, page))
    }

    async fn get_transaction(
        &self,
        ctx: &RequestContext,
        transaction_id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        Ok(self
            .inner
            .store()
            .transactions
            .get(&transaction_id)
            .filter(|tx| tx.is_visible_to(ctx))
            .cloned())
    }

    async fn list_transactions(
        &self,
        ctx: &RequestContext,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, WalletError> {
        let mut entries: Vec<_> = self
            .inner
            .store()
            .transactions
            .values()
            .filter(|tx| tx.is_visible_to(ctx) && filter.matches(tx))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            let ord = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
            match filter.sort {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        Ok(paginate(entries, page))
    }

    async fn list_completed_entries(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let mut entries: Vec<_> = self
            .inner
            .store()
            .wallet_entries(wallet_id)
            .filter(|tx| tx.is_visible_to(ctx) && tx.status == TransactionStatus::Completed)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn sum_spendable_credits(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
        now: DateTime<Utc>,
    ) -> Result<Decimal, WalletError> {
        Ok(self
            .inner
            .store()
            .wallet_entries(wallet_id)
            .filter(|tx| tx.is_visible_to(ctx) && tx.is_spendable_at(now))
            .map(|tx| tx.credits_available)
            .sum())
    }

    async fn begin(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<InMemoryUnitOfWork, WalletError> {
        if visible_wallet(&self.inner.store(), ctx, wallet_id).is_none() {
            return Err(WalletError::WalletNotFound(wallet_id));
        }

        let guard = self.inner.wallet_lock(wallet_id).lock_owned().await;

        // Re-read under the lock: the previous holder may have committed.
        let wallet = visible_wallet(&self.inner.store(), ctx, wallet_id)
            .ok_or(WalletError::WalletNotFound(wallet_id))?;

        Ok(InMemoryUnitOfWork {
            inner: Arc::clone(&self.inner),
            ctx: *ctx,
            _guard: guard,
            base_version: wallet.version,
            wallet,
            wallet_dirty: false,
            staged: HashMap::new(),
        })
    }
}

/// Unit of work over [`InMemoryWalletRepository`].
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    inner: Arc<Inner>,
    ctx: RequestContext,
    _guard: OwnedMutexGuard<()>,
    base_version: i64,
    wallet: Wallet,
    wallet_dirty: bool,
    staged: HashMap<WalletTransactionId, WalletTransaction>,
}

impl InMemoryUnitOfWork {
    /// Committed entries of this wallet overlaid with the staged ones.
    fn current_entries(&self) -> Vec<WalletTransaction> {
        let store = self.inner.store();
        let mut entries: HashMap<_, _> = store
            .wallet_entries(self.wallet.id)
            .map(|tx| (tx.id, tx.clone()))
            .collect();
        drop(store);

        for (id, tx) in &self.staged {
            entries.insert(*id, tx.clone());
        }
        entries.into_values().collect()
    }

    fn current_entry(&self, transaction_id: WalletTransactionId) -> Option<WalletTransaction> {
        if let Some(tx) = self.staged.get(&transaction_id) {
            return Some(tx.clone());
        }
        self.inner
            .store()
            .transactions
            .get(&transaction_id)
            .filter(|tx| tx.wallet_id == self.wallet.id)
            .cloned()
    }

    fn touch_wallet(&mut self) {
        self.wallet.version += 1;
        self.wallet.updated_at = Utc::now();
        self.wallet.updated_by = self.ctx.user_id;
        self.wallet_dirty = true;
    }
}

impl WalletUnitOfWork for InMemoryUnitOfWork {
    fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    async fn find_by_reference(
        &mut self,
        transaction_type: TransactionType,
        reference: &Reference,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        Ok(self.current_entries().into_iter().find(|tx| {
            tx.transaction_type == transaction_type
                && tx.status == TransactionStatus::Completed
                && &tx.reference == reference
        }))
    }

    async fn eligible_credits_page(
        &mut self,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let mut credits: Vec<_> = self
            .current_entries()
            .into_iter()
            .filter(|tx| tx.is_spendable_at(now))
            .collect();
        credits.sort_by(spend_order);

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(credits.into_iter().skip(offset).take(limit).collect())
    }

    async fn lock_transaction(
        &mut self,
        transaction_id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        Ok(self.current_entry(transaction_id))
    }

    async fn set_credits_available(
        &mut self,
        transaction_id: WalletTransactionId,
        expected: Decimal,
        new: Decimal,
    ) -> Result<(), WalletError> {
        if new < Decimal::ZERO || new > expected {
            return Err(WalletError::InvariantViolation(format!(
                "credits_available of {transaction_id} cannot move from {expected} to {new}"
            )));
        }
        if self.inner.take_injected_conflict() {
            return Err(WalletError::ConcurrentModification(format!(
                "credits_available of {transaction_id} changed"
            )));
        }

        let mut entry = self
            .current_entry(transaction_id)
            .ok_or(WalletError::TransactionNotFound(transaction_id))?;
        if !entry.is_completed_credit() {
            return Err(WalletError::InvariantViolation(format!(
                "{transaction_id} is not a completed credit"
            )));
        }
        if entry.credits_available != expected {
            return Err(WalletError::ConcurrentModification(format!(
                "credits_available of {transaction_id} is {}, expected {expected}",
                entry.credits_available
            )));
        }

        entry.credits_available = new;
        entry.updated_at = Utc::now();
        entry.updated_by = self.ctx.user_id;
        self.staged.insert(transaction_id, entry);
        Ok(())
    }

    async fn insert_transaction(
        &mut self,
        transaction: WalletTransaction,
    ) -> Result<WalletTransaction, WalletError> {
        if transaction.wallet_id != self.wallet.id {
            return Err(WalletError::InvariantViolation(format!(
                "entry for wallet {} written through unit of work of {}",
                transaction.wallet_id, self.wallet.id
            )));
        }
        if transaction.credit_amount <= Decimal::ZERO
            || transaction.credits_available < Decimal::ZERO
            || transaction.credits_available > transaction.credit_amount
        {
            return Err(WalletError::InvariantViolation(format!(
                "entry {} has credit_amount {} and credits_available {}",
                transaction.id, transaction.credit_amount, transaction.credits_available
            )));
        }
        if transaction.reference.is_idempotent()
            && transaction.status == TransactionStatus::Completed
        {
            let clash = self.current_entries().into_iter().any(|tx| {
                tx.transaction_type == transaction.transaction_type
                    && tx.status == TransactionStatus::Completed
                    && tx.reference == transaction.reference
            });
            if clash {
                return Err(WalletError::ConcurrentModification(format!(
                    "{} entry for {:?} already exists",
                    transaction.transaction_type.as_str(),
                    transaction.reference
                )));
            }
        }

        self.staged.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update_wallet_balance(
        &mut self,
        balance: Decimal,
        credit_balance: Decimal,
    ) -> Result<Wallet, WalletError> {
        self.wallet.balance = balance;
        self.wallet.credit_balance = credit_balance;
        self.touch_wallet();
        Ok(self.wallet.clone())
    }

    async fn update_wallet_status(&mut self, status: WalletStatus) -> Result<Wallet, WalletError> {
        self.wallet.wallet_status = status;
        self.touch_wallet();
        Ok(self.wallet.clone())
    }

    async fn commit(self) -> Result<(), WalletError> {
        let mut store = self.inner.store();

        let committed_version = store
            .wallets
            .get(&self.wallet.id)
            .map(|w| w.version)
            .ok_or(WalletError::WalletNotFound(self.wallet.id))?;
        if committed_version != self.base_version {
            return Err(WalletError::ConcurrentModification(format!(
                "wallet {} is at version {committed_version}, expected {}",
                self.wallet.id, self.base_version
            )));
        }

        if self.wallet_dirty {
            store.wallets.insert(self.wallet.id, self.wallet);
        }
        store.transactions.extend(self.staged);
        Ok(())
    }

    async fn rollback(self) -> Result<(), WalletError> {
        Ok(())
    }
}
