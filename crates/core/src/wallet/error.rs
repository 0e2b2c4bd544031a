//! Wallet error types.
//!
//! Every failure of a wallet operation is one of these variants. A failed
//! operation never leaves a partial write behind.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::{CustomerId, WalletId, WalletTransactionId};
use thiserror::Error;

use super::types::WalletStatus;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    // ========== Lookup Errors ==========
    /// Wallet does not exist or is not visible to the caller.
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Ledger entry does not exist or is not visible to the caller.
    #[error("Wallet transaction not found: {0}")]
    TransactionNotFound(WalletTransactionId),

    // ========== State Errors ==========
    /// Wallet status does not permit the operation.
    #[error("Wallet {wallet_id} is {status}")]
    WalletNotActive {
        /// The wallet.
        wallet_id: WalletId,
        /// Its current status.
        status: WalletStatus,
    },

    /// Status change not allowed by the lifecycle.
    #[error("Cannot change wallet status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: WalletStatus,
        /// Requested status.
        to: WalletStatus,
    },

    /// The customer already has an open wallet of this currency and type.
    #[error("Customer {customer_id} already has an open {currency} wallet of this type")]
    DuplicateWallet {
        /// The customer.
        customer_id: CustomerId,
        /// The currency.
        currency: String,
    },

    /// The entry cannot be expired.
    #[error("Wallet transaction {transaction_id} cannot be expired: {reason}")]
    CreditNotExpirable {
        /// The entry.
        transaction_id: WalletTransactionId,
        /// Why not.
        reason: &'static str,
    },

    // ========== Validation Errors ==========
    /// Amount or conversion rate is zero, negative or over-precise.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Credit expiry lies in the past.
    #[error("Expiry date {0} is in the past")]
    InvalidExpiryDate(DateTime<Utc>),

    /// Wallet attributes are malformed.
    #[error("Invalid wallet: {0}")]
    InvalidWallet(String),

    // ========== Balance Errors ==========
    /// Eligible credits do not cover the debit.
    #[error("Insufficient balance in wallet {wallet_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The wallet.
        wallet_id: WalletId,
        /// Credits requested.
        requested: Decimal,
        /// Spendable credits at the time of the check.
        available: Decimal,
    },

    // ========== Concurrency Errors ==========
    /// A conditional write found the row changed underneath it.
    #[error("Concurrent modification detected: {0}")]
    ConcurrentModification(String),

    /// Conflicts persisted through every retry.
    #[error("Gave up after {attempts} conflicting attempts")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
    },

    // ========== Storage Errors ==========
    /// A write would break a ledger invariant; the unit of work is abandoned.
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// Underlying persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WalletError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WalletNotFound(_) => "WALLET_NOT_FOUND",
            Self::TransactionNotFound(_) => "WALLET_TRANSACTION_NOT_FOUND",
            Self::WalletNotActive { .. } => "WALLET_NOT_ACTIVE",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::DuplicateWallet { .. } => "DUPLICATE_WALLET",
            Self::CreditNotExpirable { .. } => "CREDIT_NOT_EXPIRABLE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidExpiryDate(_) => "INVALID_EXPIRY_DATE",
            Self::InvalidWallet(_) => "INVALID_WALLET",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::InvariantViolation(_) => "LEDGER_INVARIANT_VIOLATION",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_) | Self::InvalidExpiryDate(_) | Self::InvalidWallet(_) => 400,

            // 404 Not Found
            Self::WalletNotFound(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict
            Self::ConcurrentModification(_) | Self::DuplicateWallet { .. } => 409,

            // 422 Unprocessable - business rule violations
            Self::WalletNotActive { .. }
            | Self::InvalidStatusTransition { .. }
            | Self::CreditNotExpirable { .. }
            | Self::InsufficientBalance { .. } => 422,

            // 500 Internal Server Error
            Self::RetriesExhausted { .. } | Self::InvariantViolation(_) | Self::Storage(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        let message = err.to_string();
        match err {
            WalletError::WalletNotFound(_) | WalletError::TransactionNotFound(_) => {
                Self::NotFound(message)
            }
            WalletError::InvalidAmount(_)
            | WalletError::InvalidExpiryDate(_)
            | WalletError::InvalidWallet(_) => Self::Validation(message),
            WalletError::WalletNotActive { .. }
            | WalletError::InvalidStatusTransition { .. }
            | WalletError::CreditNotExpirable { .. }
            | WalletError::InsufficientBalance { .. } => Self::BusinessRule(message),
            WalletError::ConcurrentModification(_) | WalletError::DuplicateWallet { .. } => {
                Self::Conflict(message)
            }
            WalletError::Storage(_) => Self::Database(message),
            WalletError::RetriesExhausted { .. } | WalletError::InvariantViolation(_) => {
                Self::Internal(message)
            }
        }
    }
}
