//! Store settings
//!
//! Loaded from environment variables with the `STORE` prefix and `__` as
//! the nesting separator:
//!
//! * `STORE__ACCOUNT__URL` - account store connection string
//! * `STORE__MARKET__URL` - market store connection string
//! * `STORE__<STORE>__MAX_CONNECTIONS` / `__MIN_CONNECTIONS` - pool sizes
//! * `STORE__<STORE>__CONNECT_TIMEOUT_SECS` - pool acquire timeout
//! * `STORE__PAGINATION__DEFAULT_PAGE_SIZE` / `__MAX_PAGE_SIZE` - listing windows
//! * `STORE__LOG_LEVEL` - fallback log filter when `RUST_LOG` is unset
//!
//! A `.env` file is read first when present.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use core_kernel::PaginationConfig;

use crate::pool::DatabaseConfig;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid setting '{key}': {message}")]
    Invalid { key: &'static str, message: String },
}

/// Connection settings of one store
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConnection {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl StoreConnection {
    /// Pool configuration for this store
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    fn validate(&self, key: &'static str) -> Result<(), SettingsError> {
        if self.url.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key,
                message: "url must not be empty".to_string(),
            });
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(SettingsError::Invalid {
                key,
                message: format!(
                    "pool sizes must satisfy 0 <= min ({}) <= max ({}) and max > 0",
                    self.min_connections, self.max_connections
                ),
            });
        }
        Ok(())
    }
}

/// Settings of both stores
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub account: StoreConnection,
    pub market: StoreConnection,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl StoreSettings {
    /// Loads settings from `.env` and the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_environment(environment())
    }

    /// Loads settings from an explicit environment source
    pub fn from_environment(source: config::Environment) -> Result<Self, SettingsError> {
        let settings: StoreSettings = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        self.account.validate("account")?;
        self.market.validate("market")?;
        let pagination = &self.pagination;
        if pagination.max_page_size == 0 || pagination.default_page_size > pagination.max_page_size {
            return Err(SettingsError::Invalid {
                key: "pagination",
                message: format!(
                    "default page size {} must be between 1 and the max page size {}",
                    pagination.default_page_size, pagination.max_page_size
                ),
            });
        }
        if pagination.default_page_size == 0 {
            return Err(SettingsError::Invalid {
                key: "pagination",
                message: "default page size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// The `STORE__*` environment source
pub fn environment() -> config::Environment {
    config::Environment::with_prefix("STORE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
