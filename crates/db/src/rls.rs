//! Row-Level Security (RLS) context management.
//!
//! Every wallet query runs inside a transaction that has the caller's tenant
//! and environment set as `PostgreSQL` session variables, so the RLS policies
//! on `wallets` and `wallet_transactions` only expose the caller's rows.
//!
//! # Usage
//!
//! ```ignore
//! use tally_db::rls::RlsConnection;
//!
//! let rls = RlsConnection::new(&db, &ctx).await?;
//! let wallets = wallets::Entity::find().all(rls.transaction()).await?;
//! rls.commit().await?;
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tally_shared::RequestContext;

/// A database transaction scoped to one tenant environment.
pub struct RlsConnection {
    txn: DatabaseTransaction,
}

impl RlsConnection {
    /// Begins a transaction and sets the RLS context with `SET LOCAL`, which
    /// scopes the settings to this transaction only.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the RLS
    /// context cannot be set.
    pub async fn new(db: &DatabaseConnection, ctx: &RequestContext) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_rls_context(&txn, ctx).await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Builds the `SET LOCAL` statements for `ctx`.
///
/// Ids are UUIDs, so interpolating them cannot inject SQL.
#[must_use]
pub fn rls_context_sql(ctx: &RequestContext) -> String {
    format!(
        "SET LOCAL app.current_tenant_id = '{}'; SET LOCAL app.current_environment_id = '{}';",
        ctx.tenant_id, ctx.environment_id
    )
}

/// Sets the RLS context on an existing transaction.
///
/// # Errors
///
/// Returns an error if the RLS context cannot be set.
pub async fn set_rls_context(txn: &DatabaseTransaction, ctx: &RequestContext) -> Result<(), DbErr> {
    txn.execute_unprepared(&rls_context_sql(ctx)).await?;
    Ok(())
}
