//! Best-effort headline scraping.
//!
//! Each [`NewsSource`] exposes a single `fetch` operation. The
//! [`NewsAggregator`] tries them in priority order, guards every call with
//! a timeout, swallows failures and merges what comes back.
//!
//! | Source | Endpoint | Format |
//! |--------|----------|--------|
//! | [`GoogleNews`] | `news.google.com/rss/search` | RSS |
//! | [`YahooFinanceNews`] | `finance.yahoo.com/quote/{ticker}/news` | HTML |
//! | [`BingNews`] | `www.bing.com/news/search` | HTML |

mod aggregator;
mod bing;
mod google;
pub mod text;
mod yahoo;

use std::future::Future;
use std::pin::Pin;

use crate::source_error::SourceError;
use crate::{NewsItem, Ticker};

pub use aggregator::{
    validate_headline_count, NewsAggregator, DEFAULT_MAX_HEADLINES, DEFAULT_SOURCE_TIMEOUT,
};
pub use bing::BingNews;
pub use google::GoogleNews;
pub use yahoo::YahooFinanceNews;

/// Headlines kept from any single source.
pub const PER_SOURCE_CAP: usize = 5;

pub type NewsFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<NewsItem>, SourceError>> + Send + 'a>>;

/// What to search news for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub company_name: String,
    pub ticker: Ticker,
}

impl NewsQuery {
    pub fn new(company_name: impl Into<String>, ticker: Ticker) -> Self {
        let company_name = company_name.into();
        let company_name = if company_name.trim().is_empty() {
            ticker.base_symbol().to_owned()
        } else {
            company_name.trim().to_owned()
        };
        Self {
            company_name,
            ticker,
        }
    }

    /// Query built from the ticker alone, when no company name is known.
    pub fn for_ticker(ticker: Ticker) -> Self {
        Self::new(String::new(), ticker)
    }
}

/// A headline provider tried by the aggregator.
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Up to `limit` cleaned headlines, in page order.
    fn fetch<'a>(&'a self, query: &'a NewsQuery, limit: usize) -> NewsFuture<'a>;
}

/// Fetches `url` and returns the body of a successful response.
pub(crate) async fn fetch_page(
    http: &dyn crate::http_client::HttpClient,
    url: &str,
    timeout_ms: u64,
) -> Result<String, SourceError> {
    let request = crate::http_client::HttpRequest::get(url)
        .with_header("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .with_header("accept-language", "en-US,en;q=0.5")
        .with_timeout_ms(timeout_ms);
    let response = http.execute(request).await.map_err(SourceError::transport)?;
    if !response.is_success() {
        return Err(SourceError::http_status(
            response.status,
            format!("{url} returned status {}", response.status),
        ));
    }
    Ok(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Market;

    #[test]
    fn blank_company_name_falls_back_to_base_symbol() {
        let ticker = crate::TickerResolver::default().resolve("TCS").expect("valid");
        let query = NewsQuery::new("   ", ticker);
        assert_eq!(query.company_name, "TCS");
        assert_eq!(query.ticker.market(), Market::Nse);
    }
}
