//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for wallets and their ledger
//! - `SeaWalletRepository`, the `PostgreSQL` implementation of the core wallet traits
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod rls;

pub use repositories::{SeaWalletRepository, SeaWalletUnitOfWork};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::DatabaseConfig;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
