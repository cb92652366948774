//! Market Store Domain
//!
//! Entities and value objects held in the market store:
//!
//! - **Asset**: a tradable instrument, unique by symbol
//! - **Quote**: price and volume of an asset at one instant, unique by
//!   `(asset_id, quoted_at)`
//! - **Symbol** and **Price**: validated value objects built through
//!   [`core_kernel::ActionResult`]

pub mod asset;
pub mod price;
pub mod quote;
pub mod symbol;

pub use asset::{by_symbol, Asset, AssetChanges, AssetClass, NewAsset};
pub use price::Price;
pub use quote::{
    for_asset, latest_quote, quote_at, quotes_between, record_quote, NewQuote, Quote,
    QuoteChanges, QuoteSource,
};
pub use symbol::Symbol;
