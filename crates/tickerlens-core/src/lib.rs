//! # tickerlens core
//!
//! Ticker resolution, market data, news aggregation and report assembly for
//! the tickerlens stock dashboard.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`analysis`] | Period change, volatility, correlation, sentiment, fundamentals score |
//! | [`cache`] | Per-session TTL cache |
//! | [`config`] | `AppConfig` from defaults, JSON file and environment |
//! | [`domain`] | Tickers, price series, fundamentals, snapshots, news items |
//! | [`error`] | Validation, fetch and configuration errors |
//! | [`fetcher`] | Snapshot fetching with retry and listing fallback |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`market_data`] | Market-data provider trait and the Yahoo Finance adapter |
//! | [`news`] | News sources and the aggregator |
//! | [`report`] | Markdown report generation |
//! | [`resolver`] | Raw input to market-qualified ticker |
//! | [`retry`] | Retry and backoff policy |
//! | [`session`] | Per-user wiring of the components |
//! | [`source_error`] | Provider-level error type |
//! | [`throttling`] | Rate limiting for outbound calls |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Dashboard/CLI  │
//! └────────┬────────┘
//!          │  AnalysisSession
//!          ▼
//! ┌─────────────────┐
//! │ TickerResolver  │
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  StockFetcher   │────▶│ MarketDataSource │──▶ Yahoo Finance
//! │ retry + cache   │     └──────────────────┘
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ NewsAggregator  │────▶│ NewsSource × N   │──▶ Google / Yahoo / Bing
//! │ timeout + gate  │     └──────────────────┘
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ ReportGenerator │──▶ <ticker>_report_<date>.md
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Only bad input is an error the user has to fix. Upstream trouble
//! degrades instead of failing:
//!
//! ```rust
//! use tickerlens_core::{FetchError, TickerResolver, ValidationError};
//!
//! let resolver = TickerResolver::default();
//! assert!(matches!(
//!     resolver.resolve(""),
//!     Err(ValidationError::InvalidSymbol { .. })
//! ));
//!
//! fn panel(result: Result<f64, FetchError>) -> String {
//!     match result {
//!         Ok(price) => format!("{price:.2}"),
//!         Err(FetchError::DataUnavailable { symbol, .. }) => format!("no data for {symbol}"),
//!     }
//! }
//! assert_eq!(panel(Ok(1.0)), "1.00");
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod market_data;
pub mod news;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod source_error;
pub mod throttling;

// Analysis
pub use analysis::{CorrelationMatrix, CorrelationPair, Sentiment};

// Caching
pub use cache::{CacheMode, CacheStore};

// Configuration
pub use config::AppConfig;

// Domain models
pub use domain::{
    DateRange, FundamentalMetric, Fundamentals, Market, NewsDigest, NewsItem, PriceBar,
    PriceSeries, Quote, SourceOutcome, StockSnapshot, Ticker, UtcDateTime, DEFAULT_RANGE_DAYS,
};

// Error types
pub use error::{ConfigError, CoreError, FetchError, SymbolIssue, ValidationError};

// Fetching
pub use fetcher::StockFetcher;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, ScriptedHttpClient,
};

// Market data
pub use market_data::{MarketDataSource, YahooFinance};

// News
pub use news::{NewsAggregator, NewsQuery, NewsSource};

// Reports
pub use report::{Report, ReportGenerator, ReportInput};

// Resolution
pub use resolver::TickerResolver;

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Sessions
pub use session::{Analysis, AnalysisSession, MarketData, TickerData};

// Provider errors
pub use source_error::{SourceError, SourceErrorKind};

// Throttling
pub use throttling::RateGate;
