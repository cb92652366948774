//! Quote entity of the market store
//!
//! A quote is the price and volume of one asset at one instant. The pair
//! `(asset_id, quoted_at)` is a unique key, so re-publishing a quote for the
//! same instant goes through the store's atomic upsert rather than a
//! find-then-create sequence.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    AssetId, DateTimeCondition, DateTimeFilter, DomainError, EntitySchema, FindMany, IntoRecord,
    Model, OrderBy, QuoteId, Record, Repository, RepositoryError, StringCondition, StringFilter,
    WhereExpression,
};

use crate::price::Price;

/// Where a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Exchange,
    Aggregator,
    Manual,
}

impl QuoteSource {
    pub const VALUES: &'static [&'static str] = &["exchange", "aggregator", "manual"];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteSource::Exchange => "exchange",
            QuoteSource::Aggregator => "aggregator",
            QuoteSource::Manual => "manual",
        }
    }
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exchange" => Ok(QuoteSource::Exchange),
            "aggregator" => Ok(QuoteSource::Aggregator),
            "manual" => Ok(QuoteSource::Manual),
            other => Err(DomainError::validation(format!("unknown quote source '{}'", other))),
        }
    }
}

static QUOTE_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::builder("Quote", "quotes")
        .string("id")
        .string("asset_id")
        .float("price")
        .int("volume")
        .datetime("quoted_at")
        .enumeration("source", QuoteSource::VALUES)
        .unique(&["asset_id", "quoted_at"])
        .build()
});

/// Price and volume of an asset at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub asset_id: AssetId,
    pub price: Price,
    pub volume: i64,
    pub quoted_at: DateTime<Utc>,
    pub source: QuoteSource,
}

impl Model for Quote {
    type Create = NewQuote;
    type Update = QuoteChanges;

    fn schema() -> &'static EntitySchema {
        &QUOTE_SCHEMA
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("asset_id", self.asset_id)
            .with("price", self.price.value())
            .with("volume", self.volume)
            .with("quoted_at", self.quoted_at)
            .with("source", self.source.as_str())
    }

    fn from_record(record: &Record) -> Result<Self, DomainError> {
        Ok(Self {
            id: record.required("id")?,
            asset_id: record.required("asset_id")?,
            price: Price::new(record.required("price")?).into_result()?,
            volume: record.required("volume")?,
            quoted_at: record.required("quoted_at")?,
            source: record.parsed("source")?,
        })
    }
}

/// Data to record a quote
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuote {
    pub id: QuoteId,
    pub asset_id: AssetId,
    pub price: Price,
    pub volume: i64,
    pub quoted_at: DateTime<Utc>,
    pub source: QuoteSource,
}

impl NewQuote {
    pub fn new(asset_id: AssetId, price: Price, quoted_at: DateTime<Utc>) -> Self {
        Self {
            id: QuoteId::new_v7(),
            asset_id,
            price,
            volume: 0,
            quoted_at,
            source: QuoteSource::Exchange,
        }
    }

    pub fn volume(mut self, volume: i64) -> Self {
        self.volume = volume;
        self
    }

    pub fn source(mut self, source: QuoteSource) -> Self {
        self.source = source;
        self
    }
}

impl IntoRecord for NewQuote {
    fn into_record(self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("asset_id", self.asset_id)
            .with("price", self.price.value())
            .with("volume", self.volume)
            .with("quoted_at", self.quoted_at)
            .with("source", self.source.as_str())
    }
}

/// Corrections to a recorded quote
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteChanges {
    price: Option<Price>,
    volume: Option<i64>,
    source: Option<QuoteSource>,
}

impl QuoteChanges {
    pub fn price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    pub fn volume(mut self, volume: i64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn source(mut self, source: QuoteSource) -> Self {
        self.source = Some(source);
        self
    }
}

impl From<&NewQuote> for QuoteChanges {
    fn from(quote: &NewQuote) -> Self {
        QuoteChanges::default()
            .price(quote.price)
            .volume(quote.volume)
            .source(quote.source)
    }
}

impl IntoRecord for QuoteChanges {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        if let Some(price) = self.price {
            record.set("price", price.value());
        }
        if let Some(volume) = self.volume {
            record.set("volume", volume);
        }
        if let Some(source) = self.source {
            record.set("source", source.as_str());
        }
        record
    }
}

/// Quotes of one asset
pub fn for_asset(asset_id: AssetId) -> WhereExpression<Quote> {
    WhereExpression::new().field(
        "asset_id",
        StringFilter::new(StringCondition::default().equals(asset_id.to_string())),
    )
}

/// The quote of an asset at an exact instant
pub fn quote_at(asset_id: AssetId, at: DateTime<Utc>) -> WhereExpression<Quote> {
    for_asset(asset_id).field("quoted_at", DateTimeFilter::new(DateTimeCondition::default().equals(at)))
}

/// Quotes of an asset in `[from, to]`
pub fn quotes_between(asset_id: AssetId, from: DateTime<Utc>, to: DateTime<Utc>) -> WhereExpression<Quote> {
    for_asset(asset_id).field(
        "quoted_at",
        DateTimeFilter::new(DateTimeCondition::default().gte(from).lte(to)),
    )
}

/// Records a quote, overwriting price, volume and source of an existing
/// quote for the same asset and instant
pub async fn record_quote<R>(quotes: &R, quote: NewQuote) -> Result<Quote, RepositoryError>
where
    R: Repository<Quote> + ?Sized,
{
    let changes = QuoteChanges::from(&quote);
    quotes
        .upsert_one(quote_at(quote.asset_id, quote.quoted_at), quote, changes, None)
        .await
}

/// Most recent quote of an asset
pub async fn latest_quote<R>(quotes: &R, asset_id: AssetId) -> Result<Option<Quote>, RepositoryError>
where
    R: Repository<Quote> + ?Sized,
{
    let query = FindMany::new()
        .filter(for_asset(asset_id))
        .order_by(OrderBy::desc("quoted_at"))
        .take(1);
    Ok(quotes.find_many(query).await?.into_iter().next())
}
