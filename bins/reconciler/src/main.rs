//! Wallet reconciliation report.
//!
//! Walks every wallet of one tenant environment and logs its balance report:
//! cached versus real-time balance, breakage, expired entries awaiting a
//! write-off, and drift between the cached balance and the ledger. Never writes.
//!
//! Usage:
//!   reconciler <tenant_id> <environment_id>

use std::sync::Arc;

use anyhow::Context;
use tally_core::wallet::{WalletService, WalletSettings};
use tally_db::{SeaWalletRepository, connect};
use tally_shared::telemetry::init_tracing;
use tally_shared::types::{EnvironmentId, PageRequest, TenantId, UserId};
use tally_shared::{AppConfig, RequestContext};
use tracing::{info, warn};

const PAGE_SIZE: u32 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let mut args = std::env::args().skip(1);
    let tenant_id: TenantId = args
        .next()
        .context("missing <tenant_id>")?
        .parse()
        .context("invalid tenant id")?;
    let environment_id: EnvironmentId = args
        .next()
        .context("missing <environment_id>")?
        .parse()
        .context("invalid environment id")?;
    let ctx = RequestContext::new(tenant_id, environment_id, UserId::new());

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let repo = Arc::new(SeaWalletRepository::new(db));
    let service = WalletService::new(repo, WalletSettings::from(&config.wallet));

    let mut page = 1;
    let mut drifted = 0_u64;
    loop {
        let wallets = service
            .list_wallets(&ctx, PageRequest::new(page, PAGE_SIZE))
            .await?;

        for wallet in &wallets.data {
            let report = service.reconcile(&ctx, wallet.id).await?;
            info!(
                wallet_id = %report.wallet_id,
                cached = %report.cached_credit_balance,
                real_time = %report.real_time_credit_balance,
                breakage = %report.breakage,
                expired_entries = report.expired_unspent_entries.len(),
                "wallet reconciled"
            );
            if !report.ledger.is_consistent() {
                drifted += 1;
                warn!(
                    wallet_id = %report.wallet_id,
                    ledger = %report.ledger.ledger_credit_balance,
                    drift = %report.ledger.drift,
                    "cached credit balance disagrees with ledger"
                );
            }
        }

        if u64::from(page) >= wallets.meta.total_pages {
            info!(wallets = wallets.meta.total, drifted, "reconciliation finished");
            break;
        }
        page += 1;
    }

    Ok(())
}
