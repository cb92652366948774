//! Pre-built Test Fixtures
//!
//! Ready-to-use values for the account and market domains. They are
//! deterministic so tests can assert on them directly.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::memory::MemoryStore;
use core_kernel::Repository;
use domain_account::{Email, HmacDigest, NewUser, Role, User};
use domain_market::{Asset, AssetClass, NewAsset, Price, Symbol};

/// Digest secret shared by the test suites
pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret";

/// Fixture for validated value objects
pub struct ValueFixtures;

impl ValueFixtures {
    /// Parses an email, panicking on invalid input
    pub fn email(raw: &str) -> Email {
        Email::new(raw).into_result().expect("fixture email must be valid")
    }

    /// Parses a symbol, panicking on invalid input
    pub fn symbol(raw: &str) -> Symbol {
        Symbol::new(raw).into_result().expect("fixture symbol must be valid")
    }

    /// Parses a price, panicking on invalid input
    pub fn price(value: f64) -> Price {
        Price::new(value).into_result().expect("fixture price must be valid")
    }

    /// Digester keyed with [`TEST_SECRET`]
    pub fn digest() -> HmacDigest {
        HmacDigest::new(TEST_SECRET).into_result().expect("fixture secret must be long enough")
    }
}

/// Fixture for temporal test data
pub struct TimeFixtures;

impl TimeFixtures {
    /// Market open on a fixed trading day (Mar 4, 2024 14:30 UTC)
    pub fn market_open() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap()
    }

    /// `n` minutes after [`TimeFixtures::market_open`]
    pub fn minute(n: i64) -> DateTime<Utc> {
        Self::market_open() + Duration::minutes(n)
    }
}

/// Fixture for account data
pub struct UserFixtures;

impl UserFixtures {
    /// Three users: an admin, a member, and a viewer on another domain
    pub fn users() -> Vec<NewUser> {
        vec![
            NewUser::new(ValueFixtures::email("ada@example.com"), "Ada").role(Role::Admin),
            NewUser::new(ValueFixtures::email("grace@example.com"), "Grace"),
            NewUser::new(ValueFixtures::email("linus@example.org"), "Linus").role(Role::Viewer),
        ]
    }

    /// An in-memory store holding [`UserFixtures::users`]
    pub async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .repository::<User>()
            .create_many(Self::users())
            .await
            .expect("seeding users");
        store
    }
}

/// Fixture for market data
pub struct AssetFixtures;

impl AssetFixtures {
    pub fn apple() -> NewAsset {
        NewAsset::new(ValueFixtures::symbol("AAPL"), "Apple Inc.", AssetClass::Equity)
            .listed_at(Utc.with_ymd_and_hms(1980, 12, 12, 14, 30, 0).unwrap())
    }

    pub fn bitcoin() -> NewAsset {
        NewAsset::new(ValueFixtures::symbol("BTC-USD"), "Bitcoin", AssetClass::Crypto)
            .listed_at(Utc.with_ymd_and_hms(2010, 7, 17, 0, 0, 0).unwrap())
    }

    pub fn euro() -> NewAsset {
        NewAsset::new(ValueFixtures::symbol("EUR/USD"), "Euro", AssetClass::Fx)
            .listed_at(Utc.with_ymd_and_hms(1999, 1, 4, 0, 0, 0).unwrap())
    }

    pub fn assets() -> Vec<NewAsset> {
        vec![Self::apple(), Self::bitcoin(), Self::euro()]
    }

    /// An in-memory store holding [`AssetFixtures::assets`]
    pub async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .repository::<Asset>()
            .create_many(Self::assets())
            .await
            .expect("seeding assets");
        store
    }
}
