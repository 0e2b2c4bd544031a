//! Credit wallets and their ledger.
//!
//! This module implements:
//! - Wallet and ledger entry types
//! - The credit consumption engine (selection and allocation)
//! - The wallet service (debit, credit, expiry, lifecycle)
//! - Balance reconciliation and breakage reporting
//! - The repository seam and an in-memory implementation

pub mod consumption;
pub mod conversion;
pub mod error;
pub mod filter;
pub mod memory;
pub mod reconcile;
pub mod repository;
pub mod service;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod consumption_props;
#[cfg(test)]
mod service_tests;
#[cfg(test)]
pub(crate) mod test_support;

pub use consumption::{Allocation, CreditConsumer};
pub use conversion::{OperationAmount, ResolvedAmount};
pub use error::WalletError;
pub use filter::{SortOrder, TransactionFilter};
pub use memory::InMemoryWalletRepository;
pub use reconcile::{BalanceReport, BreakageSummary, LedgerConsistency};
pub use repository::{WalletRepository, WalletUnitOfWork};
pub use service::{CreditRequest, DebitRequest, WalletService};
pub use transaction::{
    EntryDraft, Reference, ReferenceType, TransactionReason, TransactionStatus, TransactionType,
    WalletTransaction,
};
pub use types::{
    AutoTopupTrigger, CreateWalletInput, InitialCredits, Metadata, Wallet, WalletSettings,
    WalletStatus, WalletType,
};
