//! Repository implementations for database access.

pub mod wallet;

pub use wallet::{SeaWalletRepository, SeaWalletUnitOfWork};
