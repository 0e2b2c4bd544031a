//! Wallet repository for wallet and ledger entry database operations.
//!
//! Every query runs inside an [`RlsConnection`], so the RLS policies scope it
//! to the caller's tenant and environment; the explicit tenant/environment
//! filters below mirror them. A unit of work holds the wallet row's
//! `FOR UPDATE` lock until it commits or rolls back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, NullOrdering, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
};
use serde_json::Value as Json;
use tally_core::wallet::{
    Metadata, Reference, SortOrder, TransactionFilter, TransactionType, Wallet, WalletError,
    WalletRepository, WalletStatus, WalletTransaction, WalletUnitOfWork,
};
use tally_shared::RequestContext;
use tally_shared::types::{
    CustomerId, EnvironmentId, PageRequest, PageResponse, TenantId, UserId, WalletId,
    WalletTransactionId,
};
use tracing::{debug, instrument};

use crate::entities::sea_orm_active_enums::{
    ReferenceType as DbReferenceType, TransactionReason as DbTransactionReason,
    WalletStatus as DbWalletStatus, WalletTransactionStatus, WalletTransactionType,
};
use crate::entities::{wallet_transactions, wallets};
use crate::rls::RlsConnection;

/// `PostgreSQL` implementation of [`WalletRepository`].
#[derive(Debug, Clone)]
pub struct SeaWalletRepository {
    db: DatabaseConnection,
}

impl SeaWalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn scoped(&self, ctx: &RequestContext) -> Result<RlsConnection, WalletError> {
        RlsConnection::new(&self.db, ctx).await.map_err(storage)
    }
}

// ============================================================================
// Error and model mapping
// ============================================================================

fn storage(err: DbErr) -> WalletError {
    WalletError::Storage(err.to_string())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn metadata_from_json(value: Json) -> Metadata {
    match value {
        Json::Object(map) => map,
        _ => Metadata::new(),
    }
}

fn wallet_from_model(model: wallets::Model) -> Wallet {
    Wallet {
        id: WalletId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        environment_id: EnvironmentId::from_uuid(model.environment_id),
        customer_id: CustomerId::from_uuid(model.customer_id),
        name: model.name,
        currency: model.currency,
        wallet_type: model.wallet_type.into(),
        description: model.description,
        metadata: metadata_from_json(model.metadata),
        balance: model.balance.normalize(),
        credit_balance: model.credit_balance.normalize(),
        conversion_rate: model.conversion_rate.normalize(),
        wallet_status: model.wallet_status.into(),
        auto_topup_trigger: model.auto_topup_trigger.into(),
        auto_topup_min_balance: model.auto_topup_min_balance.map(|d| d.normalize()),
        auto_topup_amount: model.auto_topup_amount.map(|d| d.normalize()),
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        created_by: UserId::from_uuid(model.created_by),
        updated_at: model.updated_at.with_timezone(&Utc),
        updated_by: UserId::from_uuid(model.updated_by),
    }
}

fn wallet_active_model(wallet: &Wallet) -> wallets::ActiveModel {
    wallets::ActiveModel {
        id: Set(wallet.id.into_inner()),
        tenant_id: Set(wallet.tenant_id.into_inner()),
        environment_id: Set(wallet.environment_id.into_inner()),
        customer_id: Set(wallet.customer_id.into_inner()),
        name: Set(wallet.name.clone()),
        currency: Set(wallet.currency.clone()),
        wallet_type: Set(wallet.wallet_type.into()),
        description: Set(wallet.description.clone()),
        metadata: Set(Json::Object(wallet.metadata.clone())),
        balance: Set(wallet.balance),
        credit_balance: Set(wallet.credit_balance),
        conversion_rate: Set(wallet.conversion_rate),
        wallet_status: Set(wallet.wallet_status.into()),
        auto_topup_trigger: Set(wallet.auto_topup_trigger.into()),
        auto_topup_min_balance: Set(wallet.auto_topup_min_balance),
        auto_topup_amount: Set(wallet.auto_topup_amount),
        version: Set(wallet.version),
        created_at: Set(wallet.created_at.fixed_offset()),
        created_by: Set(wallet.created_by.into_inner()),
        updated_at: Set(wallet.updated_at.fixed_offset()),
        updated_by: Set(wallet.updated_by.into_inner()),
    }
}

fn transaction_from_model(model: wallet_transactions::Model) -> WalletTransaction {
    WalletTransaction {
        id: WalletTransactionId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        environment_id: EnvironmentId::from_uuid(model.environment_id),
        wallet_id: WalletId::from_uuid(model.wallet_id),
        transaction_type: model.transaction_type.into(),
        amount: model.amount.normalize(),
        credit_amount: model.credit_amount.normalize(),
        conversion_rate: model.conversion_rate.normalize(),
        credits_available: model.credits_available.normalize(),
        reference: Reference::new(model.reference_type.into(), model.reference_id),
        reason: model.reason.into(),
        status: model.transaction_status.into(),
        expiry_date: model.expiry_date.map(|d| d.with_timezone(&Utc)),
        credit_balance_before: model.credit_balance_before.normalize(),
        credit_balance_after: model.credit_balance_after.normalize(),
        description: model.description,
        metadata: metadata_from_json(model.metadata),
        created_at: model.created_at.with_timezone(&Utc),
        created_by: UserId::from_uuid(model.created_by),
        updated_at: model.updated_at.with_timezone(&Utc),
        updated_by: UserId::from_uuid(model.updated_by),
    }
}

fn transaction_active_model(tx: &WalletTransaction) -> wallet_transactions::ActiveModel {
    wallet_transactions::ActiveModel {
        id: Set(tx.id.into_inner()),
        tenant_id: Set(tx.tenant_id.into_inner()),
        environment_id: Set(tx.environment_id.into_inner()),
        wallet_id: Set(tx.wallet_id.into_inner()),
        transaction_type: Set(tx.transaction_type.into()),
        amount: Set(tx.amount),
        credit_amount: Set(tx.credit_amount),
        conversion_rate: Set(tx.conversion_rate),
        credits_available: Set(tx.credits_available),
        reference_type: Set(tx.reference.reference_type.into()),
        reference_id: Set(tx.reference.reference_id.clone()),
        reason: Set(tx.reason.into()),
        transaction_status: Set(tx.status.into()),
        expiry_date: Set(tx.expiry_date.map(|d| d.fixed_offset())),
        credit_balance_before: Set(tx.credit_balance_before),
        credit_balance_after: Set(tx.credit_balance_after),
        description: Set(tx.description.clone()),
        metadata: Set(Json::Object(tx.metadata.clone())),
        created_at: Set(tx.created_at.fixed_offset()),
        created_by: Set(tx.created_by.into_inner()),
        updated_at: Set(tx.updated_at.fixed_offset()),
        updated_by: Set(tx.updated_by.into_inner()),
    }
}

// ============================================================================
// Query builders
// ============================================================================

fn scoped_wallets(ctx: &RequestContext) -> Select<wallets::Entity> {
    wallets::Entity::find()
        .filter(wallets::Column::TenantId.eq(ctx.tenant_id.into_inner()))
        .filter(wallets::Column::EnvironmentId.eq(ctx.environment_id.into_inner()))
}

fn scoped_transactions(ctx: &RequestContext) -> Select<wallet_transactions::Entity> {
    wallet_transactions::Entity::find()
        .filter(wallet_transactions::Column::TenantId.eq(ctx.tenant_id.into_inner()))
        .filter(wallet_transactions::Column::EnvironmentId.eq(ctx.environment_id.into_inner()))
}

/// Credits of `wallet_id` that can fund a debit at `now`.
fn spendable_credits(
    ctx: &RequestContext,
    wallet_id: WalletId,
    now: DateTime<Utc>,
) -> Select<wallet_transactions::Entity> {
    use wallet_transactions::Column;

    scoped_transactions(ctx)
        .filter(Column::WalletId.eq(wallet_id.into_inner()))
        .filter(Column::TransactionType.eq(WalletTransactionType::Credit))
        .filter(Column::TransactionStatus.eq(WalletTransactionStatus::Completed))
        .filter(Column::CreditsAvailable.gt(Decimal::ZERO))
        .filter(
            Condition::any()
                .add(Column::ExpiryDate.is_null())
                .add(Column::ExpiryDate.gte(now.fixed_offset())),
        )
}

fn filter_condition(filter: &TransactionFilter) -> Condition {
    use wallet_transactions::Column;

    let mut cond = Condition::all();
    if let Some(wallet_id) = filter.wallet_id {
        cond = cond.add(Column::WalletId.eq(wallet_id.into_inner()));
    }
    if let Some(transaction_type) = filter.transaction_type {
        cond = cond.add(Column::TransactionType.eq(WalletTransactionType::from(transaction_type)));
    }
    if let Some(status) = filter.status {
        cond = cond.add(Column::TransactionStatus.eq(WalletTransactionStatus::from(status)));
    }
    if let Some(reason) = filter.reason {
        cond = cond.add(Column::Reason.eq(DbTransactionReason::from(reason)));
    }
    if let Some(reference) = &filter.reference {
        cond = cond
            .add(Column::ReferenceType.eq(DbReferenceType::from(reference.reference_type)))
            .add(Column::ReferenceId.eq(reference.reference_id.clone()));
    }
    if let Some(after) = filter.created_after {
        cond = cond.add(Column::CreatedAt.gte(after.fixed_offset()));
    }
    if let Some(before) = filter.created_before {
        cond = cond.add(Column::CreatedAt.lt(before.fixed_offset()));
    }
    if let Some(after) = filter.expiry_after {
        cond = cond.add(Column::ExpiryDate.gte(after.fixed_offset()));
    }
    if let Some(before) = filter.expiry_before {
        cond = cond.add(Column::ExpiryDate.lt(before.fixed_offset()));
    }
    if let Some(min) = filter.credits_available_gt {
        cond = cond.add(Column::CreditsAvailable.gt(min));
    }
    cond
}

// ============================================================================
// Repository
// ============================================================================

impl WalletRepository for SeaWalletRepository {
    type UnitOfWork = SeaWalletUnitOfWork;

    #[instrument(skip(self, ctx, wallet), fields(wallet_id = %wallet.id))]
    async fn create_wallet(&self, ctx: &RequestContext, wallet: Wallet) -> Result<Wallet, WalletError> {
        if !wallet.is_visible_to(ctx) {
            return Err(WalletError::InvalidWallet(
                "wallet belongs to another tenant or environment".to_string(),
            ));
        }

        let rls = self.scoped(ctx).await?;
        let inserted = match wallet_active_model(&wallet).insert(rls.transaction()).await {
            Ok(model) => model,
            Err(err) if is_unique_violation(&err) => {
                rls.rollback().await.map_err(storage)?;
                return Err(WalletError::DuplicateWallet {
                    customer_id: wallet.customer_id,
                    currency: wallet.currency,
                });
            }
            Err(err) => return Err(storage(err)),
        };
        rls.commit().await.map_err(storage)?;

        Ok(wallet_from_model(inserted))
    }

    async fn get_wallet(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>, WalletError> {
        let rls = self.scoped(ctx).await?;
        let model = scoped_wallets(ctx)
            .filter(wallets::Column::Id.eq(wallet_id.into_inner()))
            .one(rls.transaction())
            .await
            .map_err(storage)?;
        rls.commit().await.map_err(storage)?;

        Ok(model.map(wallet_from_model))
    }

    async fn find_wallets_by_customer(
        &self,
        ctx: &RequestContext,
        customer_id: CustomerId,
    ) -> Result<Vec<Wallet>, WalletError> {
        let rls = self.scoped(ctx).await?;
        let models = scoped_wallets(ctx)
            .filter(wallets::Column::CustomerId.eq(customer_id.into_inner()))
            .order_by_asc(wallets::Column::CreatedAt)
            .order_by_asc(wallets::Column::Id)
            .all(rls.transaction())
            .await
            .map_err(storage)?;
        rls.commit().await.map_err(storage)?;

        Ok(models.into_iter().map(wallet_from_model).collect())
    }

    async fn list_wallets(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<PageResponse<Wallet>, WalletError> {
        let rls = self.scoped(ctx).await?;
        let total = scoped_wallets(ctx)
            .count(rls.transaction())
            .await
            .map_err(storage)?;
        let models = scoped_wallets(ctx)
            .order_by_asc(wallets::Column::CreatedAt)
            .order_by_asc(wallets::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(rls.transaction())
            .await
            .map_err(storage)?;
        rls.commit().await.map_err(storage)?;

        let data = models.into_iter().map(wallet_from_model).collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    async fn get_transaction(
        &self,
        ctx: &RequestContext,
        transaction_id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let rls = self.scoped(ctx).await?;
        let model = scoped_transactions(ctx)
            .filter(wallet_transactions::Column::Id.eq(transaction_id.into_inner()))
            .one(rls.transaction())
            .await
            .map_err(storage)?;
        rls.commit().await.map_err(storage)?;

        Ok(model.map(transaction_from_model))
    }

    async fn list_transactions(
        &self,
        ctx: &RequestContext,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<WalletTransaction>, WalletError> {
        let order = match filter.sort {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        let rls = self.scoped(ctx).await?;
        let total = scoped_transactions(ctx)
            .filter(filter_condition(filter))
            .count(rls.transaction())
            .await
            .map_err(storage)?;
        let models = scoped_transactions(ctx)
            .filter(filter_condition(filter))
            .order_by(wallet_transactions::Column::CreatedAt, order.clone())
            .order_by(wallet_transactions::Column::Id, order)
            .offset(page.offset())
            .limit(page.limit())
            .all(rls.transaction())
            .await
            .map_err(storage)?;
        rls.commit().await.map_err(storage)?;

        let data = models.into_iter().map(transaction_from_model).collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    async fn list_completed_entries(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let rls = self.scoped(ctx).await?;
        let models = scoped_transactions(ctx)
            .filter(wallet_transactions::Column::WalletId.eq(wallet_id.into_inner()))
            .filter(
                wallet_transactions::Column::TransactionStatus
                    .eq(WalletTransactionStatus::Completed),
            )
            .order_by_asc(wallet_transactions::Column::CreatedAt)
            .order_by_asc(wallet_transactions::Column::Id)
            .all(rls.transaction())
            .await
            .map_err(storage)?;
        rls.commit().await.map_err(storage)?;

        Ok(models.into_iter().map(transaction_from_model).collect())
    }

    async fn sum_spendable_credits(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
        now: DateTime<Utc>,
    ) -> Result<Decimal, WalletError> {
        let rls = self.scoped(ctx).await?;
        let total: Option<Option<Decimal>> = spendable_credits(ctx, wallet_id, now)
            .select_only()
            .column_as(wallet_transactions::Column::CreditsAvailable.sum(), "total")
            .into_tuple()
            .one(rls.transaction())
            .await
            .map_err(storage)?;
        rls.commit().await.map_err(storage)?;

        Ok(total.flatten().unwrap_or(Decimal::ZERO).normalize())
    }

    async fn begin(
        &self,
        ctx: &RequestContext,
        wallet_id: WalletId,
    ) -> Result<SeaWalletUnitOfWork, WalletError> {
        let rls = self.scoped(ctx).await?;
        let locked = scoped_wallets(ctx)
            .filter(wallets::Column::Id.eq(wallet_id.into_inner()))
            .lock_exclusive()
            .one(rls.transaction())
            .await
            .map_err(storage)?;

        let Some(model) = locked else {
            rls.rollback().await.map_err(storage)?;
            return Err(WalletError::WalletNotFound(wallet_id));
        };
        debug!(%wallet_id, version = model.version, "wallet row locked");

        Ok(SeaWalletUnitOfWork {
            conn: rls,
            ctx: *ctx,
            wallet: wallet_from_model(model),
        })
    }
}

// ============================================================================
// Unit of work
// ============================================================================

/// Unit of work over one locked wallet row.
///
/// Wraps a database transaction; dropping it without `commit` rolls back.
pub struct SeaWalletUnitOfWork {
    conn: RlsConnection,
    ctx: RequestContext,
    wallet: Wallet,
}

impl SeaWalletUnitOfWork {
    fn wallet_transactions(&self) -> Select<wallet_transactions::Entity> {
        scoped_transactions(&self.ctx)
            .filter(wallet_transactions::Column::WalletId.eq(self.wallet.id.into_inner()))
    }

    /// Bumps the wallet version, conditional on the version this unit of work holds.
    async fn write_wallet(
        &mut self,
        columns: Vec<(wallets::Column, SimpleExpr)>,
    ) -> Result<(), WalletError> {
        let now = Utc::now();
        let mut update = wallets::Entity::update_many()
            .col_expr(wallets::Column::Version, Expr::value(self.wallet.version + 1))
            .col_expr(wallets::Column::UpdatedAt, Expr::value(now.fixed_offset()))
            .col_expr(
                wallets::Column::UpdatedBy,
                Expr::value(self.ctx.user_id.into_inner()),
            );
        for (column, value) in columns {
            update = update.col_expr(column, value);
        }

        let result = update
            .filter(wallets::Column::Id.eq(self.wallet.id.into_inner()))
            .filter(wallets::Column::Version.eq(self.wallet.version))
            .exec(self.conn.transaction())
            .await
            .map_err(storage)?;

        if result.rows_affected == 0 {
            return Err(WalletError::ConcurrentModification(format!(
                "wallet {} is no longer at version {}",
                self.wallet.id, self.wallet.version
            )));
        }

        self.wallet.version += 1;
        self.wallet.updated_at = now;
        self.wallet.updated_by = self.ctx.user_id;
        Ok(())
    }
}

impl WalletUnitOfWork for SeaWalletUnitOfWork {
    fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    async fn find_by_reference(
        &mut self,
        transaction_type: TransactionType,
        reference: &Reference,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        use wallet_transactions::Column;

        let model = self
            .wallet_transactions()
            .filter(Column::TransactionType.eq(WalletTransactionType::from(transaction_type)))
            .filter(Column::TransactionStatus.eq(WalletTransactionStatus::Completed))
            .filter(Column::ReferenceType.eq(DbReferenceType::from(reference.reference_type)))
            .filter(Column::ReferenceId.eq(reference.reference_id.clone()))
            .one(self.conn.transaction())
            .await
            .map_err(storage)?;

        Ok(model.map(transaction_from_model))
    }

    async fn eligible_credits_page(
        &mut self,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        use wallet_transactions::Column;

        let models = spendable_credits(&self.ctx, self.wallet.id, now)
            .order_by_with_nulls(Column::ExpiryDate, Order::Asc, NullOrdering::Last)
            .order_by_desc(Column::CreditAmount)
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .offset(offset)
            .limit(limit)
            .lock_exclusive()
            .all(self.conn.transaction())
            .await
            .map_err(storage)?;

        Ok(models.into_iter().map(transaction_from_model).collect())
    }

    async fn lock_transaction(
        &mut self,
        transaction_id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let model = self
            .wallet_transactions()
            .filter(wallet_transactions::Column::Id.eq(transaction_id.into_inner()))
            .lock_exclusive()
            .one(self.conn.transaction())
            .await
            .map_err(storage)?;

        Ok(model.map(transaction_from_model))
    }

    async fn set_credits_available(
        &mut self,
        transaction_id: WalletTransactionId,
        expected: Decimal,
        new: Decimal,
    ) -> Result<(), WalletError> {
        use wallet_transactions::Column;

        if new < Decimal::ZERO || new > expected {
            return Err(WalletError::InvariantViolation(format!(
                "credits_available of {transaction_id} cannot move from {expected} to {new}"
            )));
        }

        let result = wallet_transactions::Entity::update_many()
            .col_expr(Column::CreditsAvailable, Expr::value(new))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .col_expr(Column::UpdatedBy, Expr::value(self.ctx.user_id.into_inner()))
            .filter(Column::Id.eq(transaction_id.into_inner()))
            .filter(Column::WalletId.eq(self.wallet.id.into_inner()))
            .filter(Column::TransactionType.eq(WalletTransactionType::Credit))
            .filter(Column::TransactionStatus.eq(WalletTransactionStatus::Completed))
            .filter(Column::CreditsAvailable.eq(expected))
            .exec(self.conn.transaction())
            .await
            .map_err(storage)?;

        if result.rows_affected == 0 {
            let current = self.lock_transaction(transaction_id).await?;
            return Err(match current {
                None => WalletError::TransactionNotFound(transaction_id),
                Some(tx) if !tx.is_completed_credit() => WalletError::InvariantViolation(format!(
                    "{transaction_id} is not a completed credit"
                )),
                Some(tx) => WalletError::ConcurrentModification(format!(
                    "credits_available of {transaction_id} is {}, expected {expected}",
                    tx.credits_available
                )),
            });
        }

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

        match transaction_active_model(&transaction)
            .insert(self.conn.transaction())
            .await
        {
            Ok(model) => Ok(transaction_from_model(model)),
            // A concurrent writer committed an entry with the same reference.
            Err(err) if is_unique_violation(&err) => Err(WalletError::ConcurrentModification(
                format!(
                    "{} entry for {:?} already exists",
                    transaction.transaction_type.as_str(),
                    transaction.reference
                ),
            )),
            Err(err) => Err(storage(err)),
        }
    }

    async fn update_wallet_balance(
        &mut self,
        balance: Decimal,
        credit_balance: Decimal,
    ) -> Result<Wallet, WalletError> {
        self.write_wallet(vec![
            (wallets::Column::Balance, Expr::value(balance)),
            (wallets::Column::CreditBalance, Expr::value(credit_balance)),
        ])
        .await?;

        self.wallet.balance = balance;
        self.wallet.credit_balance = credit_balance;
        Ok(self.wallet.clone())
    }

    async fn update_wallet_status(&mut self, status: WalletStatus) -> Result<Wallet, WalletError> {
        let column = wallets::Column::WalletStatus;
        let value = column.save_as(Expr::val(DbWalletStatus::from(status)));
        self.write_wallet(vec![(column, value)]).await?;

        self.wallet.wallet_status = status;
        Ok(self.wallet.clone())
    }

    async fn commit(self) -> Result<(), WalletError> {
        let wallet_id = self.wallet.id;
        self.conn.commit().await.map_err(storage)?;
        debug!(%wallet_id, "wallet unit of work committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), WalletError> {
        self.conn.rollback().await.map_err(storage)
    }
}
