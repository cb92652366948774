//! Store check
//!
//! Connects to the account and market stores, applies pending migrations
//! and reports row counts.
//!
//! # Usage
//!
//! ```bash
//! STORE__ACCOUNT__URL=postgres://localhost/account \
//! STORE__MARKET__URL=postgres://localhost/market \
//! cargo run --bin store-check
//! ```
//!
//! `RUST_LOG` overrides `STORE__LOG_LEVEL` (default: info).

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::{Repository, WhereExpression};
use domain_account::User;
use domain_market::{Asset, Quote};
use infra_db::{StoreSettings, Stores};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = StoreSettings::from_env().context("loading store settings")?;
    init_tracing(&settings.log_level);

    tracing::info!(
        max_page_size = settings.pagination.max_page_size,
        "Checking stores"
    );

    let stores = Stores::connect(&settings).await.context("connecting to stores")?;
    stores.migrate().await.context("applying migrations")?;

    let users = stores
        .account
        .repository::<User>()
        .count_many(WhereExpression::new())
        .await
        .context("counting users")?;
    let assets = stores
        .market
        .repository::<Asset>()
        .count_many(WhereExpression::new())
        .await
        .context("counting assets")?;
    let quotes = stores
        .market
        .repository::<Quote>()
        .count_many(WhereExpression::new())
        .await
        .context("counting quotes")?;

    tracing::info!(store = "account", users, "Store ready");
    tracing::info!(store = "market", assets, quotes, "Store ready");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
