//! `SeaORM` Entity for wallet_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{
    ReferenceType, TransactionReason, WalletTransactionStatus, WalletTransactionType,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub environment_id: Uuid,
    pub wallet_id: Uuid,
    pub transaction_type: WalletTransactionType,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub credit_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub conversion_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub credits_available: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub reason: TransactionReason,
    pub transaction_status: WalletTransactionStatus,
    pub expiry_date: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub credit_balance_before: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub credit_balance_after: Decimal,
    pub description: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Uuid,
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
