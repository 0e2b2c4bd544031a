//! Core wallet logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the repository traits in [`wallet::repository`].
//!
//! # Modules
//!
//! - `wallet` - Wallets, the credit ledger, the consumption engine and reconciliation
//! - `clock` - Time source used for credit expiry

pub mod clock;
pub mod wallet;
