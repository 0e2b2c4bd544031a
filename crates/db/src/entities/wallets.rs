//! `SeaORM` Entity for wallets table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{AutoTopupTrigger, WalletStatus, WalletType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub environment_id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub currency: String,
    pub wallet_type: WalletType,
    pub description: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub credit_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))")]
    pub conversion_rate: Decimal,
    pub wallet_status: WalletStatus,
    pub auto_topup_trigger: AutoTopupTrigger,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))", nullable)]
    pub auto_topup_min_balance: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((20, 9)))", nullable)]
    pub auto_topup_amount: Option<Decimal>,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Uuid,
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wallet_transactions::Entity")]
    WalletTransactions,
}

impl Related<super::wallet_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
