//! Infrastructure Database Layer
//!
//! PostgreSQL adapter for the repository contract of `core_kernel`, built
//! on SQLx.
//!
//! # Architecture
//!
//! - [`sql`] renders predicates and repository operations into
//!   parameterised statements with `sqlx::QueryBuilder`
//! - [`PgStore`] / [`PgRepository`] execute them on a pool, and [`PgScope`]
//!   on one transaction
//! - [`Stores`] connects the account and market stores and applies their
//!   migrations
//! - [`StoreSettings`] loads pool and pagination settings from the
//!   environment
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{StoreSettings, Stores};
//! use domain_market::{Asset, by_symbol, Symbol};
//! use core_kernel::Repository;
//!
//! let settings = StoreSettings::from_env()?;
//! let stores = Stores::connect(&settings).await?;
//! stores.migrate().await?;
//!
//! let symbol = Symbol::new("AAPL").into_result()?;
//! let apple = stores.market.repository::<Asset>().find_one(by_symbol(&symbol), None).await?;
//! ```

pub mod error;
pub mod pool;
pub mod repository;
pub mod settings;
pub mod sql;
pub mod stores;

pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use repository::{PgRepository, PgScope, PgStore};
pub use settings::{SettingsError, StoreConnection, StoreSettings};
pub use stores::{migrate, StoreKind, Stores};
