//! Test Data Builders
//!
//! Builders for account and market records with randomised but valid
//! defaults. Tests set only the fields they care about; identifying fields
//! carry a random suffix so builders never collide on unique keys.

use chrono::{DateTime, Utc};
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::{FirstName, Name};
use fake::Fake;
use uuid::Uuid;

use core_kernel::AssetId;
use domain_account::{NewUser, Role};
use domain_market::{AssetClass, NewAsset, NewQuote, QuoteSource};

use crate::fixtures::{TimeFixtures, ValueFixtures};

fn suffix(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_string()
}

/// Builder for [`NewUser`]
pub struct TestUserBuilder {
    email: String,
    display_name: String,
    role: Role,
    api_key: Option<String>,
}

impl Default for TestUserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestUserBuilder {
    /// Creates a new builder with a unique email and a fake name
    pub fn new() -> Self {
        let first: String = FirstName().fake();
        Self {
            email: format!("{}.{}@example.com", first.to_lowercase(), suffix(8)),
            display_name: Name().fake(),
            role: Role::Member,
            api_key: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Issues an API key, digested with the test secret
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn build(self) -> NewUser {
        let user = NewUser::new(ValueFixtures::email(&self.email), self.display_name).role(self.role);
        match self.api_key {
            Some(key) => user.api_key(&ValueFixtures::digest(), &key),
            None => user,
        }
    }
}

/// Builder for [`NewAsset`]
pub struct TestAssetBuilder {
    symbol: String,
    name: String,
    asset_class: AssetClass,
    listed_at: Option<DateTime<Utc>>,
}

impl Default for TestAssetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAssetBuilder {
    /// Creates a new builder with a unique symbol and a fake company name
    pub fn new() -> Self {
        Self {
            symbol: format!("T{}", suffix(7)).to_uppercase(),
            name: CompanyName().fake(),
            asset_class: AssetClass::Equity,
            listed_at: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_class(mut self, asset_class: AssetClass) -> Self {
        self.asset_class = asset_class;
        self
    }

    pub fn with_listed_at(mut self, at: DateTime<Utc>) -> Self {
        self.listed_at = Some(at);
        self
    }

    pub fn build(self) -> NewAsset {
        let asset = NewAsset::new(ValueFixtures::symbol(&self.symbol), self.name, self.asset_class);
        match self.listed_at {
            Some(at) => asset.listed_at(at),
            None => asset,
        }
    }
}

/// Builder for [`NewQuote`]
pub struct TestQuoteBuilder {
    asset_id: AssetId,
    price: f64,
    quoted_at: DateTime<Utc>,
    volume: i64,
    source: QuoteSource,
}

impl TestQuoteBuilder {
    /// A quote at market open with a random price and volume
    pub fn new(asset_id: AssetId) -> Self {
        let cents: u32 = (100..1_000_000).fake();
        Self {
            asset_id,
            price: f64::from(cents) / 100.0,
            quoted_at: TimeFixtures::market_open(),
            volume: (1..100_000i64).fake(),
            source: QuoteSource::Exchange,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.quoted_at = at;
        self
    }

    pub fn with_volume(mut self, volume: i64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_source(mut self, source: QuoteSource) -> Self {
        self.source = source;
        self
    }

    pub fn build(self) -> NewQuote {
        NewQuote::new(self.asset_id, ValueFixtures::price(self.price), self.quoted_at)
            .volume(self.volume)
            .source(self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_builder_defaults_are_unique() {
        let a = TestUserBuilder::new().build();
        let b = TestUserBuilder::new().build();
        assert_ne!(a.email, b.email);
        assert_eq!(a.role, Role::Member);
    }

    #[test]
    fn test_user_builder_overrides() {
        let user = TestUserBuilder::new()
            .with_email("Root@Example.com")
            .with_role(Role::Admin)
            .with_api_key("key-1")
            .build();
        assert_eq!(user.email.as_str(), "root@example.com");
        assert_eq!(user.role, Role::Admin);
        assert!(user.api_key_digest.is_some());
    }

    #[test]
    fn test_asset_builder_symbol_is_valid() {
        let asset = TestAssetBuilder::new().with_class(AssetClass::Commodity).build();
        assert!(asset.symbol.as_str().starts_with('T'));
        assert_eq!(asset.symbol.as_str().len(), 8);
        assert_eq!(asset.asset_class, AssetClass::Commodity);
    }

    #[test]
    fn test_quote_builder() {
        let quote = TestQuoteBuilder::new(AssetId::new_v7())
            .with_price(12.5)
            .at(TimeFixtures::minute(5))
            .with_volume(0)
            .build();
        assert_eq!(quote.price.value(), 12.5);
        assert_eq!(quote.volume, 0);
        assert_eq!(quote.quoted_at, TimeFixtures::minute(5));
    }
}
