//! Market-data provider contract.
//!
//! A [`MarketDataSource`] turns provider JSON into typed values at the
//! boundary. It performs a single logical call per method; retry, listing
//! fallback and caching are layered on top by [`crate::StockFetcher`].
//!
//! | Method | Returns | Used for |
//! |--------|---------|----------|
//! | [`history`](MarketDataSource::history) | [`PriceHistory`] | price chart, performance, correlation |
//! | [`profile`](MarketDataSource::profile) | [`CompanyProfile`] | name, quote, fundamentals table |

mod yahoo;

use std::future::Future;
use std::pin::Pin;

use crate::source_error::SourceError;
use crate::{DateRange, Fundamentals, PriceBar, Ticker};

pub use yahoo::{YahooAuthManager, YahooFinance};

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Listing metadata reported alongside price history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingMeta {
    pub name: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub regular_market_price: Option<f64>,
}

/// Daily bars for a range, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    pub bars: Vec<PriceBar>,
    pub meta: ListingMeta,
}

/// Company name, latest price and fundamentals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub price: Option<f64>,
    pub fundamentals: Fundamentals,
}

/// Provider of price history and company profiles.
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn history<'a>(&'a self, ticker: &'a Ticker, range: DateRange) -> SourceFuture<'a, PriceHistory>;

    fn profile<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, CompanyProfile>;
}
