//! `SeaORM` active enums mirroring the `PostgreSQL` enum types, and their
//! conversions to and from the core domain enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::wallet as domain;

/// Maps a database enum onto its domain twin, variant by variant.
macro_rules! mirror_enum {
    ($db:ident <=> $core:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$db> for domain::$core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }

        impl From<domain::$core> for $db {
            fn from(value: domain::$core) -> Self {
                match value {
                    $(domain::$core::$variant => Self::$variant,)+
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_status")]
pub enum WalletStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "frozen")]
    Frozen,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_type")]
pub enum WalletType {
    #[sea_orm(string_value = "prepaid")]
    Prepaid,
    #[sea_orm(string_value = "promotional")]
    Promotional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "auto_topup_trigger")]
pub enum AutoTopupTrigger {
    #[sea_orm(string_value = "disabled")]
    Disabled,
    #[sea_orm(string_value = "balance_below_threshold")]
    BalanceBelowThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_transaction_type")]
pub enum WalletTransactionType {
    #[sea_orm(string_value = "credit")]
    Credit,
    #[sea_orm(string_value = "debit")]
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_transaction_status")]
pub enum WalletTransactionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_reason")]
pub enum TransactionReason {
    #[sea_orm(string_value = "free_credit")]
    FreeCredit,
    #[sea_orm(string_value = "subscription_credit")]
    SubscriptionCredit,
    #[sea_orm(string_value = "credit_note")]
    CreditNote,
    #[sea_orm(string_value = "purchased_credit_invoiced")]
    PurchasedCreditInvoiced,
    #[sea_orm(string_value = "purchased_credit_direct")]
    PurchasedCreditDirect,
    #[sea_orm(string_value = "invoice_payment")]
    InvoicePayment,
    #[sea_orm(string_value = "manual_adjustment")]
    ManualAdjustment,
    #[sea_orm(string_value = "credit_expired")]
    CreditExpired,
    #[sea_orm(string_value = "wallet_termination")]
    WalletTermination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reference_type")]
pub enum ReferenceType {
    #[sea_orm(string_value = "invoice")]
    Invoice,
    #[sea_orm(string_value = "payment")]
    Payment,
    #[sea_orm(string_value = "subscription")]
    Subscription,
    #[sea_orm(string_value = "external")]
    External,
    #[sea_orm(string_value = "wallet_transaction")]
    WalletTransaction,
    #[sea_orm(string_value = "request")]
    Request,
}

mirror_enum!(WalletStatus <=> WalletStatus { Active, Frozen, Closed });
mirror_enum!(WalletType <=> WalletType { Prepaid, Promotional });
mirror_enum!(AutoTopupTrigger <=> AutoTopupTrigger { Disabled, BalanceBelowThreshold });
mirror_enum!(WalletTransactionType <=> TransactionType { Credit, Debit });
mirror_enum!(WalletTransactionStatus <=> TransactionStatus { Pending, Completed, Failed });
mirror_enum!(TransactionReason <=> TransactionReason {
    FreeCredit,
    SubscriptionCredit,
    CreditNote,
    PurchasedCreditInvoiced,
    PurchasedCreditDirect,
    InvoicePayment,
    ManualAdjustment,
    CreditExpired,
    WalletTermination,
});
mirror_enum!(ReferenceType <=> ReferenceType {
    Invoice,
    Payment,
    Subscription,
    External,
    WalletTransaction,
    Request,
});
