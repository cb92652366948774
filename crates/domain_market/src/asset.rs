//! Asset entity of the market store

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    AssetId, DomainError, EntitySchema, IntoRecord, Model, Record, StringCondition, StringFilter,
    WhereExpression,
};

use crate::symbol::Symbol;

/// Broad class of a tradable asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Crypto,
    Fx,
    Commodity,
}

impl AssetClass {
    pub const VALUES: &'static [&'static str] = &["equity", "crypto", "fx", "commodity"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Crypto => "crypto",
            AssetClass::Fx => "fx",
            AssetClass::Commodity => "commodity",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equity" => Ok(AssetClass::Equity),
            "crypto" => Ok(AssetClass::Crypto),
            "fx" => Ok(AssetClass::Fx),
            "commodity" => Ok(AssetClass::Commodity),
            other => Err(DomainError::validation(format!("unknown asset class '{}'", other))),
        }
    }
}

static ASSET_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::builder("Asset", "assets")
        .string("id")
        .string("symbol")
        .string("name")
        .enumeration("asset_class", AssetClass::VALUES)
        .boolean("active")
        .datetime("listed_at")
        .unique(&["symbol"])
        .build()
});

/// A tradable instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: Symbol,
    pub name: String,
    pub asset_class: AssetClass,
    pub active: bool,
    pub listed_at: DateTime<Utc>,
}

impl Model for Asset {
    type Create = NewAsset;
    type Update = AssetChanges;

    fn schema() -> &'static EntitySchema {
        &ASSET_SCHEMA
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("symbol", self.symbol.as_str())
            .with("name", self.name.clone())
            .with("asset_class", self.asset_class.as_str())
            .with("active", self.active)
            .with("listed_at", self.listed_at)
    }

    fn from_record(record: &Record) -> Result<Self, DomainError> {
        let symbol: String = record.required("symbol")?;
        Ok(Self {
            id: record.required("id")?,
            symbol: Symbol::new(symbol).into_result()?,
            name: record.required("name")?,
            asset_class: record.parsed("asset_class")?,
            active: record.required("active")?,
            listed_at: record.required("listed_at")?,
        })
    }
}

/// Data to list a new asset
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub id: AssetId,
    pub symbol: Symbol,
    pub name: String,
    pub asset_class: AssetClass,
    pub listed_at: DateTime<Utc>,
}

impl NewAsset {
    /// An active asset listed now
    pub fn new(symbol: Symbol, name: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            id: AssetId::new_v7(),
            symbol,
            name: name.into(),
            asset_class,
            listed_at: Utc::now(),
        }
    }

    pub fn listed_at(mut self, at: DateTime<Utc>) -> Self {
        self.listed_at = at;
        self
    }
}

impl IntoRecord for NewAsset {
    fn into_record(self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("symbol", self.symbol.as_str())
            .with("name", self.name)
            .with("asset_class", self.asset_class.as_str())
            .with("active", true)
            .with("listed_at", self.listed_at)
    }
}

/// Changes to an asset; only the fields set here are written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetChanges {
    name: Option<String>,
    asset_class: Option<AssetClass>,
    active: Option<bool>,
}

impl AssetChanges {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn asset_class(mut self, asset_class: AssetClass) -> Self {
        self.asset_class = Some(asset_class);
        self
    }

    /// Marks the asset as no longer traded
    pub fn delist(mut self) -> Self {
        self.active = Some(false);
        self
    }

    pub fn relist(mut self) -> Self {
        self.active = Some(true);
        self
    }
}

impl IntoRecord for AssetChanges {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        if let Some(name) = self.name {
            record.set("name", name);
        }
        if let Some(asset_class) = self.asset_class {
            record.set("asset_class", asset_class.as_str());
        }
        if let Some(active) = self.active {
            record.set("active", active);
        }
        record
    }
}

/// Where clause pinning an asset by symbol
pub fn by_symbol(symbol: &Symbol) -> WhereExpression<Asset> {
    WhereExpression::new().field(
        "symbol",
        StringFilter::new(StringCondition::default().equals(symbol.as_str())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::new(raw).into_result().unwrap()
    }

    #[test]
    fn test_record_round_trip() {
        let record = NewAsset::new(symbol("btc-usd"), "Bitcoin", AssetClass::Crypto).into_record();
        let asset = Asset::from_record(&record).unwrap();
        assert_eq!(asset.symbol.as_str(), "BTC-USD");
        assert!(asset.active);
        assert_eq!(asset.to_record(), record);
    }

    #[test]
    fn test_unknown_class_fails_decoding() {
        let record = NewAsset::new(symbol("XAU"), "Gold", AssetClass::Commodity)
            .into_record()
            .with("asset_class", "metal");
        assert!(Asset::from_record(&record).is_err());
    }

    #[test]
    fn test_by_symbol_is_a_unique_key() {
        let key = by_symbol(&symbol("aapl")).unique_key().unwrap();
        assert_eq!(key.len(), 1);
        assert_eq!(key[0].0, "symbol");
        assert_eq!(key[0].1.as_str(), Some("AAPL"));
    }

    #[test]
    fn test_delist_writes_only_active() {
        let record = AssetChanges::default().delist().into_record();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("active").as_bool(), Some(false));
    }
}
