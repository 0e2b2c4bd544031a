//! Persistence seam for wallets and their ledger.
//!
//! These traits are implemented by the db crate (PostgreSQL via SeaORM) and by
//! [`super::memory::InMemoryWalletRepository`]. Every method is scoped to the
//! tenant and environment of the supplied [`RequestContext`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::RequestContext;
use tally_shared::types::{CustomerId, PageRequest, PageResponse, WalletId, WalletTransactionId};

use super::error::WalletError;
use super::filter::TransactionFilter;
use super::transaction::{Reference, TransactionType, WalletTransaction};
use super::types::{Wallet, WalletStatus};

/// Repository trait for wallet persistence.
pub trait WalletRepository: Send + Sync {
    /// Unit of work returned by [`WalletRepository::begin`].
    type UnitOfWork: WalletUnitOfWork;

    /// Insert a new wallet.
    ///
    /// Fails with `DuplicateWallet` if the customer already has a non-closed
    /// wallet with the same currency and type.
    fn create_wallet(
        &self,
        ctx: &RequestContext,
        wallet: Wallet,
    ) -> impl std::future::Future<Output = Result<Wallet, WalletError>> + Send;

    /// Find a wallet by ID.
    fn get_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> impl std::future::Future<Output = Result<Option<Wallet>, WalletError>> + Send;

    /// List a customer's wallets.
    fn find_wallets_by_customer(
        &self,
        ctx: &RequestContext,
        customer_id: CustomerId,
    ) -> impl std::future::Future<Output = Result<Vec<Wallet>, WalletError>> + Send;

    /// List wallets in the context's environment, oldest first.
    fn list_wallets(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<PageResponse<Wallet>, WalletError>> + Send;

    /// Find a ledger entry by ID.
    fn get_transaction(
        &self,
        ctx: &RequestContext,
        transaction_id: WalletTransactionId,
    ) -> impl std::future::Future<Output = Result<Option<WalletTransaction>, WalletError>> + Send;

    /// List ledger entries matching `filter`.
    fn list_transactions(
        &self,
        ctx: &RequestContext,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<PageResponse<WalletTransaction>, WalletError>> + Send;

    /// All completed entries of a wallet, credits and debits, oldest first.
    fn list_completed_entries(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> impl std::future::Future<Output = Result<Vec<WalletTransaction>, WalletError>> + Send;

    /// Sum of `credits_available` over the wallet's spendable credits at `now`.
    fn sum_spendable_credits(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Decimal, WalletError>> + Send;

    /// Open a unit of work on one wallet.
    ///
    /// Holds the wallet's serialization guarantee until commit, rollback or
    /// drop: no other unit of work on the same wallet can write meanwhile.
    /// Fails with `WalletNotFound` if the wallet is not visible.
    fn begin(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> impl std::future::Future<Output = Result<Self::UnitOfWork, WalletError>> + Send;
}

/// An atomic set of reads and writes on one wallet.
///
/// Writes become visible only on [`commit`](WalletUnitOfWork::commit).
/// Dropping an uncommitted unit of work discards its writes.
pub trait WalletUnitOfWork: Send {
    /// The wallet as of the last write in this unit of work.
    fn wallet(&self) -> &Wallet;

    /// Find a completed entry of `transaction_type` carrying `reference`.
    fn find_by_reference(
        &mut self,
        transaction_type: TransactionType,
        reference: &Reference,
    ) -> impl std::future::Future<Output = Result<Option<WalletTransaction>, WalletError>> + Send;

    /// One page of spendable credits at `now`, in spend order.
    fn eligible_credits_page(
        &mut self,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<WalletTransaction>, WalletError>> + Send;

    /// Read and lock one of the wallet's entries.
    fn lock_transaction(
        &mut self,
        transaction_id: WalletTransactionId,
    ) -> impl std::future::Future<Output = Result<Option<WalletTransaction>, WalletError>> + Send;

    /// Set a credit entry's `credits_available` to `new`, only if it still holds `expected`.
    ///
    /// Fails with `ConcurrentModification` when the row changed, and with
    /// `InvariantViolation` if `new` is negative or exceeds `expected`.
    fn set_credits_available(
        &mut self,
        transaction_id: WalletTransactionId,
        expected: Decimal,
        new: Decimal,
    ) -> impl std::future::Future<Output = Result<(), WalletError>> + Send;

    /// Append a ledger entry.
    fn insert_transaction(
        &mut self,
        transaction: WalletTransaction,
    ) -> impl std::future::Future<Output = Result<WalletTransaction, WalletError>> + Send;

    /// Write the cached balances, conditional on the wallet version read by this unit of work.
    fn update_wallet_balance(
        &mut self,
        balance: Decimal,
        credit_balance: Decimal,
    ) -> impl std::future::Future<Output = Result<Wallet, WalletError>> + Send;

    /// Write the wallet status, conditional on the wallet version read by this unit of work.
    fn update_wallet_status(
        &mut self,
        status: WalletStatus,
    ) -> impl std::future::Future<Output = Result<Wallet, WalletError>> + Send;

    /// Make every write visible atomically.
    fn commit(self) -> impl std::future::Future<Output = Result<(), WalletError>> + Send;

    /// Discard every write.
    fn rollback(self) -> impl std::future::Future<Output = Result<(), WalletError>> + Send;
}
