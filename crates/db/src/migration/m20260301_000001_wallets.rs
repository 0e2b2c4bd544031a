//! Wallet schema.
//!
//! Creates the wallet enums, the `wallets` and `wallet_transactions` tables,
//! their indexes, and the tenant/environment RLS policies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(WALLETS_SQL).await?;
        db.execute_unprepared(WALLET_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE wallet_status AS ENUM ('active', 'frozen', 'closed');
CREATE TYPE wallet_type AS ENUM ('prepaid', 'promotional');
CREATE TYPE auto_topup_trigger AS ENUM ('disabled', 'balance_below_threshold');
CREATE TYPE wallet_transaction_type AS ENUM ('credit', 'debit');
CREATE TYPE wallet_transaction_status AS ENUM ('pending', 'completed', 'failed');
CREATE TYPE transaction_reason AS ENUM (
    'free_credit',
    'subscription_credit',
    'credit_note',
    'purchased_credit_invoiced',
    'purchased_credit_direct',
    'invoice_payment',
    'manual_adjustment',
    'credit_expired',
    'wallet_termination'
);
CREATE TYPE reference_type AS ENUM (
    'invoice',
    'payment',
    'subscription',
    'external',
    'wallet_transaction',
    'request'
);
";

const WALLETS_SQL: &str = r"
CREATE TABLE wallets (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    environment_id UUID NOT NULL,
    customer_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    wallet_type wallet_type NOT NULL DEFAULT 'prepaid',
    description TEXT,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    balance NUMERIC(20, 9) NOT NULL DEFAULT 0,
    credit_balance NUMERIC(20, 9) NOT NULL DEFAULT 0,
    conversion_rate NUMERIC(20, 9) NOT NULL DEFAULT 1,
    wallet_status wallet_status NOT NULL DEFAULT 'active',
    auto_topup_trigger auto_topup_trigger NOT NULL DEFAULT 'disabled',
    auto_topup_min_balance NUMERIC(20, 9),
    auto_topup_amount NUMERIC(20, 9),
    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_by UUID NOT NULL,

    CONSTRAINT chk_wallet_conversion_rate CHECK (conversion_rate > 0),
    CONSTRAINT chk_wallet_credit_balance CHECK (credit_balance >= 0),
    CONSTRAINT chk_wallet_currency CHECK (currency ~ '^[A-Z]{3}$')
);

CREATE INDEX idx_wallets_scope ON wallets(tenant_id, environment_id);
CREATE INDEX idx_wallets_customer ON wallets(tenant_id, environment_id, customer_id);

-- One open wallet per customer, currency and type
CREATE UNIQUE INDEX uq_wallets_open_per_customer
    ON wallets(tenant_id, environment_id, customer_id, currency, wallet_type)
    WHERE wallet_status <> 'closed';
";

const WALLET_TRANSACTIONS_SQL: &str = r"
CREATE TABLE wallet_transactions (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    environment_id UUID NOT NULL,
    wallet_id UUID NOT NULL REFERENCES wallets(id),
    transaction_type wallet_transaction_type NOT NULL,
    amount NUMERIC(20, 9) NOT NULL,
    credit_amount NUMERIC(20, 9) NOT NULL,
    conversion_rate NUMERIC(20, 9) NOT NULL,
    credits_available NUMERIC(20, 9) NOT NULL DEFAULT 0,
    reference_type reference_type NOT NULL,
    reference_id VARCHAR(255) NOT NULL,
    reason transaction_reason NOT NULL,
    transaction_status wallet_transaction_status NOT NULL DEFAULT 'completed',
    expiry_date TIMESTAMPTZ,
    credit_balance_before NUMERIC(20, 9) NOT NULL,
    credit_balance_after NUMERIC(20, 9) NOT NULL,
    description TEXT,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_by UUID NOT NULL,

    CONSTRAINT chk_wallet_tx_credit_amount CHECK (credit_amount > 0),
    CONSTRAINT chk_wallet_tx_available_range
        CHECK (credits_available >= 0 AND credits_available <= credit_amount),
    CONSTRAINT chk_wallet_tx_debit_shape
        CHECK (transaction_type = 'credit' OR (credits_available = 0 AND expiry_date IS NULL)),
    CONSTRAINT chk_wallet_tx_balance_after CHECK (credit_balance_after >= 0)
);

CREATE INDEX idx_wallet_tx_wallet_created ON wallet_transactions(wallet_id, created_at);

-- Drives the expiry-first credit selection
CREATE INDEX idx_wallet_tx_eligible
    ON wallet_transactions(wallet_id, expiry_date, credits_available)
    WHERE transaction_type = 'credit' AND transaction_status = 'completed';

-- Idempotency key; request-scoped references are never deduplicated
CREATE UNIQUE INDEX uq_wallet_tx_reference
    ON wallet_transactions(wallet_id, transaction_type, reference_type, reference_id)
    WHERE transaction_status = 'completed' AND reference_type <> 'request';
";

const RLS_SQL: &str = r"
ALTER TABLE wallets ENABLE ROW LEVEL SECURITY;
ALTER TABLE wallet_transactions ENABLE ROW LEVEL SECURITY;

-- Application sets context per transaction:
-- SET LOCAL app.current_tenant_id = '...'; SET LOCAL app.current_environment_id = '...';
CREATE POLICY tenant_isolation ON wallets
    USING (
        tenant_id = current_setting('app.current_tenant_id', true)::UUID
        AND environment_id = current_setting('app.current_environment_id', true)::UUID
    );

CREATE POLICY tenant_isolation ON wallet_transactions
    USING (
        tenant_id = current_setting('app.current_tenant_id', true)::UUID
        AND environment_id = current_setting('app.current_environment_id', true)::UUID
    );
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS wallet_transactions CASCADE;
DROP TABLE IF EXISTS wallets CASCADE;
DROP TYPE IF EXISTS reference_type;
DROP TYPE IF EXISTS transaction_reason;
DROP TYPE IF EXISTS wallet_transaction_status;
DROP TYPE IF EXISTS wallet_transaction_type;
DROP TYPE IF EXISTS auto_topup_trigger;
DROP TYPE IF EXISTS wallet_type;
DROP TYPE IF EXISTS wallet_status;
";
