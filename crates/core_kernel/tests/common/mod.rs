//! Test entity shared by the integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{DomainError, EntitySchema, IntoRecord, Model, Record};
use once_cell::sync::Lazy;

pub const VENUES: &[&str] = &["nyse", "nasdaq", "lse"];

static LISTING_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::builder("Listing", "listings")
        .string("id")
        .string("symbol")
        .enumeration("venue", VENUES)
        .int("lot_size")
        .float("price")
        .boolean("active")
        .datetime("listed_at")
        .nullable_string("note")
        .unique(&["symbol"])
        .build()
});

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: String,
    pub symbol: String,
    pub venue: String,
    pub lot_size: i64,
    pub price: f64,
    pub active: bool,
    pub listed_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl Listing {
    pub fn new(id: &str, symbol: &str, price: f64) -> Self {
        Self {
            id: id.to_string(),
            symbol: symbol.to_string(),
            venue: "nyse".to_string(),
            lot_size: 100,
            price,
            active: true,
            listed_at: Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap(),
            note: None,
        }
    }

    pub fn venue(mut self, venue: &str) -> Self {
        self.venue = venue.to_string();
        self
    }

    pub fn note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl IntoRecord for Listing {
    fn into_record(self) -> Record {
        self.to_record()
    }
}

impl Model for Listing {
    type Create = Listing;
    type Update = Record;

    fn schema() -> &'static EntitySchema {
        &LISTING_SCHEMA
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id.clone())
            .with("symbol", self.symbol.clone())
            .with("venue", self.venue.clone())
            .with("lot_size", self.lot_size)
            .with("price", self.price)
            .with("active", self.active)
            .with("listed_at", self.listed_at)
            .with("note", self.note.clone())
    }

    fn from_record(record: &Record) -> Result<Self, DomainError> {
        Ok(Self {
            id: record.required("id")?,
            symbol: record.required("symbol")?,
            venue: record.required("venue")?,
            lot_size: record.required("lot_size")?,
            price: record.required("price")?,
            active: record.required("active")?,
            listed_at: record.required("listed_at")?,
            note: record.optional("note")?,
        })
    }
}

/// A small fixed table used across tests
pub fn listings() -> Vec<Listing> {
    vec![
        Listing::new("L1", "AAPL", 189.5).venue("nasdaq"),
        Listing::new("L2", "abc", 12.0).note("lowercase ticker"),
        Listing::new("L3", "ABCD", 45.25).venue("lse").inactive(),
        Listing::new("L4", "a_b%", 1.0).note("metachar"),
        Listing::new("L5", "ZZ", 0.5).venue("lse"),
    ]
}

pub fn records() -> Vec<Record> {
    listings().iter().map(Model::to_record).collect()
}
