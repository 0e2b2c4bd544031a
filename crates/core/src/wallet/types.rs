//! Wallet domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::RequestContext;
use tally_shared::types::{CustomerId, EnvironmentId, TenantId, UserId, WalletId};

use super::conversion;
use super::error::WalletError;

/// Free-form key/value metadata attached to wallets and ledger entries.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status of a wallet.
///
/// `active` and `frozen` can move back and forth; `closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Debits and credits are allowed.
    Active,
    /// Debits are rejected; credits depend on configuration.
    Frozen,
    /// No further mutation.
    Closed,
}

impl WalletStatus {
    /// Returns true if the wallet may be debited.
    #[must_use]
    pub fn allows_debit(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true if the wallet may receive credits.
    #[must_use]
    pub fn allows_credit(self, allow_frozen: bool) -> bool {
        match self {
            Self::Active => true,
            Self::Frozen => allow_frozen,
            Self::Closed => false,
        }
    }

    /// Returns true if the status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true if a wallet in this status may move to `to`.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Active, Self::Frozen)
                | (Self::Frozen, Self::Active)
                | (Self::Active | Self::Frozen, Self::Closed)
        )
    }

    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the wallet's credits are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    /// Credits bought or granted for usage.
    Prepaid,
    /// Promotional credits, usually expiring.
    Promotional,
}

impl WalletType {
    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepaid => "prepaid",
            Self::Promotional => "promotional",
        }
    }
}

/// When an external collaborator should top the wallet up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoTopupTrigger {
    /// Never.
    #[default]
    Disabled,
    /// When the credit balance drops below `auto_topup_min_balance`.
    BalanceBelowThreshold,
}

/// A customer's credit wallet.
///
/// `credit_balance` is a cached value; the ledger is the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet ID.
    pub id: WalletId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning tenant environment.
    pub environment_id: EnvironmentId,
    /// Customer the wallet belongs to.
    pub customer_id: CustomerId,
    /// Display name.
    pub name: String,
    /// ISO 4217 currency of `balance`.
    pub currency: String,
    /// Wallet type.
    pub wallet_type: WalletType,
    /// Optional description.
    pub description: Option<String>,
    /// Arbitrary metadata.
    pub metadata: Metadata,
    /// Cached balance in currency units (`credit_balance × conversion_rate`).
    pub balance: Decimal,
    /// Cached balance in credit units.
    pub credit_balance: Decimal,
    /// Currency value of one credit.
    pub conversion_rate: Decimal,
    /// Lifecycle status.
    pub wallet_status: WalletStatus,
    /// Auto top-up trigger.
    pub auto_topup_trigger: AutoTopupTrigger,
    /// Threshold for `BalanceBelowThreshold`, in credits.
    pub auto_topup_min_balance: Option<Decimal>,
    /// Suggested top-up size, in credits.
    pub auto_topup_amount: Option<Decimal>,
    /// Optimistic lock counter, bumped on every balance or status write.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Creating user.
    pub created_by: UserId,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Last updating user.
    pub updated_by: UserId,
}

impl Wallet {
    /// Returns true if the row is visible to `ctx`.
    #[must_use]
    pub fn is_visible_to(&self, ctx: &RequestContext) -> bool {
        ctx.owns(self.tenant_id, self.environment_id)
    }

    /// Returns true if the configured auto top-up threshold has been crossed.
    #[must_use]
    pub fn needs_auto_topup(&self) -> bool {
        match (self.auto_topup_trigger, self.auto_topup_min_balance) {
            (AutoTopupTrigger::BalanceBelowThreshold, Some(min)) => self.credit_balance < min,
            _ => false,
        }
    }

    /// Returns a copy with the cached balances set from `credit_balance`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the currency balance cannot be computed.
    pub fn with_credit_balance(mut self, credit_balance: Decimal) -> Result<Self, WalletError> {
        self.balance = conversion::credits_to_currency(credit_balance, self.conversion_rate)?;
        self.credit_balance = credit_balance;
        Ok(self)
    }
}

/// Initial credits loaded when a wallet is created.
#[derive(Debug, Clone)]
pub struct InitialCredits {
    /// Amount in credits.
    pub credit_amount: Decimal,
    /// Optional expiry for the grant.
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Input for creating a wallet.
#[derive(Debug, Clone)]
pub struct CreateWalletInput {
    /// Customer the wallet belongs to.
    pub customer_id: CustomerId,
    /// Display name.
    pub name: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Wallet type.
    pub wallet_type: WalletType,
    /// Currency value of one credit; must be positive.
    pub conversion_rate: Decimal,
    /// Optional description.
    pub description: Option<String>,
    /// Arbitrary metadata.
    pub metadata: Metadata,
    /// Auto top-up trigger.
    pub auto_topup_trigger: AutoTopupTrigger,
    /// Auto top-up threshold in credits.
    pub auto_topup_min_balance: Option<Decimal>,
    /// Auto top-up amount in credits.
    pub auto_topup_amount: Option<Decimal>,
    /// Credits granted with reason `free_credit` right after creation.
    pub initial_credits: Option<InitialCredits>,
}

impl CreateWalletInput {
    /// Creates a prepaid wallet input with a 1:1 conversion rate.
    #[must_use]
    pub fn prepaid(customer_id: CustomerId, currency: impl Into<String>) -> Self {
        Self {
            customer_id,
            name: "Prepaid Wallet".to_string(),
            currency: currency.into(),
            wallet_type: WalletType::Prepaid,
            conversion_rate: Decimal::ONE,
            description: None,
            metadata: Metadata::new(),
            auto_topup_trigger: AutoTopupTrigger::Disabled,
            auto_topup_min_balance: None,
            auto_topup_amount: None,
            initial_credits: None,
        }
    }
}

/// Runtime settings of the wallet service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSettings {
    /// Page size used by the consumption engine.
    pub credit_page_size: u64,
    /// Retries after a `ConcurrentModification` before giving up.
    pub max_retries: u32,
    /// Whether frozen wallets accept credits.
    pub allow_credit_on_frozen: bool,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            credit_page_size: 100,
            max_retries: 3,
            allow_credit_on_frozen: false,
        }
    }
}

impl From<&tally_shared::WalletConfig> for WalletSettings {
    fn from(config: &tally_shared::WalletConfig) -> Self {
        Self {
            credit_page_size: config.credit_page_size.max(1),
            max_retries: config.max_retries,
            allow_credit_on_frozen: config.allow_credit_on_frozen,
        }
    }
}
