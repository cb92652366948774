//! Database Test Utilities
//!
//! Provides a PostgreSQL testcontainer shared by the integration tests of a
//! test binary. Every test gets its own database inside that container, so
//! tests stay isolated without paying for a container each.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "store_test";

pub type TestDbError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// Connection URL of another database on the same server
    pub fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, database
        )
    }
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container for testing
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start
    pub async fn new() -> Result<Self, TestDbError> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };

        Ok(Self {
            _container: container,
            config,
        })
    }

    /// Creates a fresh, empty database and returns a pool connected to it
    ///
    /// The name gets a random suffix so concurrent tests never share one.
    /// Schemas are left to the caller.
    pub async fn fresh_database(&self, prefix: &str) -> Result<PgPool, TestDbError> {
        let name = format!("{}_{}", prefix, Uuid::new_v4().simple());

        // CREATE DATABASE cannot run inside a transaction; use the simple protocol
        let mut admin = PgConnection::connect(&self.config.connection_url()).await?;
        sqlx::raw_sql(&format!("CREATE DATABASE \"{}\"", name))
            .execute(&mut admin)
            .await?;
        admin.close().await?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.config.url_for(&name))
            .await?;
        Ok(pool)
    }
}

/// Global test container for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or starts the shared test container
///
/// # Panics
///
/// Panics if the container fails to start
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to start shared test database"),
            )
        })
        .await
        .clone()
}

/// Creates an empty database in the shared container
///
/// # Panics
///
/// Panics if the database cannot be created
pub async fn fresh_test_pool(prefix: &str) -> PgPool {
    get_shared_test_database()
        .await
        .fresh_database(prefix)
        .await
        .expect("Failed to create test database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_connection_url() {
        let config = TestDatabaseConfig::default();
        let url = config.connection_url();

        assert!(url.starts_with("postgres://"));
        assert!(url.contains(POSTGRES_USER));
        assert!(url.ends_with("/store_test"));
        assert!(config.url_for("market_1").ends_with(":5432/market_1"));
    }
}
