mod news;
mod snapshot;
mod ticker;
mod timestamp;

pub use news::{NewsDigest, NewsItem, SourceOutcome};
pub use snapshot::{
    DateRange, FundamentalMetric, Fundamentals, PriceBar, PriceSeries, Quote, StockSnapshot,
    DEFAULT_RANGE_DAYS,
};
pub use ticker::{Market, Ticker};
pub(crate) use ticker::normalize_symbol;
pub use timestamp::UtcDateTime;
