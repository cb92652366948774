//! The two stores of the system
//!
//! The account store holds users; the market store holds assets and quotes.
//! They are separate databases with separate pools and migrations, and no
//! transaction spans both.

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::fmt;
use tracing::info;

use crate::error::DatabaseError;
use crate::pool::create_pool;
use crate::repository::PgStore;
use crate::settings::StoreSettings;

static ACCOUNT_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/account");
static MARKET_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/market");

/// Which store a pool belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Account,
    Market,
}

impl StoreKind {
    pub fn name(&self) -> &'static str {
        match self {
            StoreKind::Account => "account",
            StoreKind::Market => "market",
        }
    }

    pub fn migrator(&self) -> &'static Migrator {
        match self {
            StoreKind::Account => &ACCOUNT_MIGRATIONS,
            StoreKind::Market => &MARKET_MIGRATIONS,
        }
    }

    /// Wraps a pool connected to this store
    pub fn store(&self, pool: PgPool) -> PgStore {
        PgStore::new(self.name(), pool)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applies the pending migrations of one store
pub async fn migrate(kind: StoreKind, pool: &PgPool) -> Result<(), DatabaseError> {
    info!(store = kind.name(), "Running database migrations");
    kind.migrator().run(pool).await?;
    info!(store = kind.name(), "Database migrations applied");
    Ok(())
}

/// Connected account and market stores
#[derive(Debug, Clone)]
pub struct Stores {
    pub account: PgStore,
    pub market: PgStore,
}

impl Stores {
    /// Opens one pool per store
    pub async fn connect(settings: &StoreSettings) -> Result<Self, DatabaseError> {
        let account = create_pool(settings.account.database_config()).await?;
        let market = create_pool(settings.market.database_config()).await?;
        Ok(Self {
            account: StoreKind::Account.store(account),
            market: StoreKind::Market.store(market),
        })
    }

    /// Applies pending migrations to both stores
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        migrate(StoreKind::Account, self.account.pool()).await?;
        migrate(StoreKind::Market, self.market.pool()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_store_embeds_its_migrations() {
        for kind in [StoreKind::Account, StoreKind::Market] {
            let migrations: Vec<_> = kind.migrator().iter().collect();
            assert!(!migrations.is_empty(), "{kind} has no migrations");
        }
        let account_sql = &StoreKind::Account.migrator().iter().next().unwrap().sql;
        assert!(account_sql.contains("CREATE TABLE users"));
        let market_sql = &StoreKind::Market.migrator().iter().next().unwrap().sql;
        assert!(market_sql.contains("UNIQUE (asset_id, quoted_at)"));
    }
}
