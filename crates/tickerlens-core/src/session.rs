//! Per-user wiring of the pipeline components.
//!
//! An [`AnalysisSession`] owns one HTTP client (and so one cookie jar), the
//! snapshot and headline caches and both rate gates. Nothing here is shared
//! across sessions.
//!
//! Work is split in two phases so a dashboard can draw charts before any
//! news source answers:
//!
//! 1. [`AnalysisSession::market_data`] resolves input and fetches snapshots.
//! 2. [`AnalysisSession::headlines`] aggregates news for one fetched ticker.
//!
//! Both phases are cached, so a report rendered after an analysis issues no
//! further requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::analysis::{correlation_matrix, CorrelationMatrix};
use crate::cache::{CacheMode, CacheStore};
use crate::config::AppConfig;
use crate::error::{ConfigError, FetchError, ValidationError};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::market_data::{MarketDataSource, YahooFinance};
use crate::news::{NewsAggregator, NewsQuery};
use crate::report::{Report, ReportGenerator, ReportInput};
use crate::throttling::RateGate;
use crate::{DateRange, NewsDigest, StockFetcher, StockSnapshot, Ticker, TickerResolver, UtcDateTime};

/// Market data for one requested ticker, before headlines are gathered.
#[derive(Debug, Clone)]
pub struct TickerData {
    pub ticker: Ticker,
    pub snapshot: Result<StockSnapshot, FetchError>,
}

impl TickerData {
    /// Headlines are searched for the listing that answered, under its
    /// company name, so Yahoo pages match. Without a snapshot the requested
    /// ticker is used.
    pub fn news_query(&self) -> NewsQuery {
        match &self.snapshot {
            Ok(snapshot) => NewsQuery::new(snapshot.company_name.clone(), snapshot.ticker.clone()),
            Err(_) => NewsQuery::for_ticker(self.ticker.clone()),
        }
    }
}

/// Snapshots for every ticker of one request, in input order.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub tickers: Vec<TickerData>,
    pub correlation: Option<CorrelationMatrix>,
}

/// Results for every ticker of one analysis request.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub inputs: Vec<ReportInput>,
    pub correlation: Option<CorrelationMatrix>,
}

#[derive(Clone)]
pub struct AnalysisSession {
    resolver: TickerResolver,
    fetcher: StockFetcher,
    news: NewsAggregator,
    reports: ReportGenerator,
    market_cache: CacheStore<MarketData>,
    news_cache: CacheStore<NewsDigest>,
    range_days: u32,
    max_headlines: usize,
}

impl AnalysisSession {
    /// Session talking to the live providers.
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::with_http(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Session over a caller-supplied transport.
    pub fn with_http(config: &AppConfig, http: Arc<dyn HttpClient>) -> Result<Self, ConfigError> {
        Ok(Self::with_resolver(config, config.resolver()?, http))
    }

    /// Session over an already loaded resolver. Never touches the filesystem.
    pub fn with_resolver(config: &AppConfig, resolver: TickerResolver, http: Arc<dyn HttpClient>) -> Self {
        let market: Arc<dyn MarketDataSource> =
            Arc::new(YahooFinance::new(Arc::clone(&http)).with_timeout_ms(config.timeout_ms));
        let fetcher = StockFetcher::new(market)
            .with_retry(config.retry_config())
            .with_cache(CacheStore::new(config.cache_ttl()))
            .with_listing_gate(RateGate::every(config.listing_interval()));
        let news = NewsAggregator::with_default_sources(http, config.timeout_ms)
            .with_rate_gate(RateGate::every(config.news_interval()));

        Self::from_parts(resolver, fetcher, news)
            .with_cache_ttl(config.cache_ttl())
            .with_range_days(config.range_days)
            .with_max_headlines(config.max_headlines)
    }

    pub fn from_parts(resolver: TickerResolver, fetcher: StockFetcher, news: NewsAggregator) -> Self {
        let defaults = AppConfig::default();
        Self {
            resolver,
            fetcher,
            news,
            reports: ReportGenerator::new(),
            market_cache: CacheStore::new(defaults.cache_ttl()),
            news_cache: CacheStore::new(defaults.cache_ttl()),
            range_days: defaults.range_days,
            max_headlines: defaults.max_headlines,
        }
    }

    /// Lifetime of cached request results. Zero disables both caches.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.market_cache = CacheStore::new(ttl);
        self.news_cache = CacheStore::new(ttl);
        self
    }

    pub fn with_range_days(mut self, days: u32) -> Self {
        self.range_days = days.max(1);
        self
    }

    pub fn with_max_headlines(mut self, max: usize) -> Self {
        self.max_headlines = max.max(1);
        self
    }

    pub fn resolver(&self) -> &TickerResolver {
        &self.resolver
    }

    pub fn max_headlines(&self) -> usize {
        self.max_headlines
    }

    /// The configured lookback ending now.
    pub fn default_range(&self) -> Result<DateRange, ValidationError> {
        DateRange::last_days(self.range_days)
    }

    pub fn resolve(&self, raw: &str) -> Result<Vec<Ticker>, ValidationError> {
        self.resolver.resolve_many(raw)
    }

    pub async fn snapshot(&self, ticker: &Ticker, range: DateRange) -> Result<StockSnapshot, FetchError> {
        self.fetcher.fetch(ticker, range).await
    }

    /// Resolves `raw` and fetches a snapshot for each ticker in input order.
    ///
    /// [`CacheMode::Refresh`] refetches every ticker and replaces the cached
    /// result.
    pub async fn market_data(
        &self,
        raw: &str,
        range: DateRange,
        mode: CacheMode,
    ) -> Result<MarketData, ValidationError> {
        let tickers = self.resolve(raw)?;
        let key = market_key(&tickers, range);
        if mode.reads() {
            if let Some(data) = self.market_cache.get(&key).await {
                debug!(key = %key, "market data served from session cache");
                return Ok(data);
            }
        }

        let mut fetched = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let snapshot = self.fetcher.fetch_with_mode(&ticker, range, mode).await;
            fetched.push(TickerData { ticker, snapshot });
        }
        let snapshots: Vec<&StockSnapshot> = fetched
            .iter()
            .filter_map(|data| data.snapshot.as_ref().ok())
            .collect();
        let correlation = correlation_matrix(&snapshots);
        info!(
            tickers = fetched.len(),
            available = snapshots.len(),
            "market data ready"
        );

        let data = MarketData {
            tickers: fetched,
            correlation,
        };
        if mode.writes() {
            self.market_cache.put(key, data.clone()).await;
        }
        Ok(data)
    }

    /// Up to `max` headlines for one fetched ticker. Never fails.
    pub async fn headlines(&self, data: &TickerData, max: usize) -> NewsDigest {
        let query = data.news_query();
        let key = format!("{}|{}|{max}", query.ticker.symbol(), query.company_name);
        if let Some(digest) = self.news_cache.get(&key).await {
            debug!(ticker = %query.ticker, "headlines served from session cache");
            return digest;
        }

        let digest = self.news.aggregate(&query, max).await;
        self.news_cache.put(key, digest.clone()).await;
        digest
    }

    /// Snapshot then headlines for one ticker. Never fails.
    pub async fn analyze_ticker(&self, ticker: &Ticker, range: DateRange, max: usize) -> ReportInput {
        let data = TickerData {
            ticker: ticker.clone(),
            snapshot: self.snapshot(ticker, range).await,
        };
        let news = self.headlines(&data, max).await;
        ReportInput::new(data.ticker, data.snapshot, news)
    }

    /// Both phases for every ticker of `raw`.
    pub async fn analyze(&self, raw: &str, range: DateRange, max: usize) -> Result<Analysis, ValidationError> {
        let market = self.market_data(raw, range, CacheMode::Use).await?;
        let mut inputs = Vec::with_capacity(market.tickers.len());
        for data in market.tickers {
            let news = self.headlines(&data, max).await;
            inputs.push(ReportInput::new(data.ticker, data.snapshot, news));
        }
        Ok(Analysis {
            inputs,
            correlation: market.correlation,
        })
    }

    pub fn render(&self, analysis: &Analysis, generated: UtcDateTime) -> Report {
        self.reports.generate(&analysis.inputs, generated)
    }

    /// Downloadable report dated `generated`, built from cached results when
    /// the same request was analyzed recently.
    pub async fn report(
        &self,
        raw: &str,
        range: DateRange,
        max: usize,
        generated: UtcDateTime,
    ) -> Result<Report, ValidationError> {
        let analysis = self.analyze(raw, range, max).await?;
        Ok(self.render(&analysis, generated))
    }
}

fn market_key(tickers: &[Ticker], range: DateRange) -> String {
    let symbols: Vec<&str> = tickers.iter().map(Ticker::symbol).collect();
    format!("{}|{}", symbols.join(","), range.cache_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;
    use crate::retry::RetryConfig;

    const GOOGLE_NEWS: &str = "https://news.google.com";

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.retry.max_retries = 0;
        config.news_interval_ms = 1;
        config.listing_interval_ms = 1;
        config
    }

    fn session(http: Arc<ScriptedHttpClient>) -> AnalysisSession {
        AnalysisSession::with_http(&config(), http).expect("default config")
    }

    #[tokio::test]
    async fn invalid_symbol_stops_before_any_request() {
        let http = Arc::new(ScriptedHttpClient::new());
        let session = session(Arc::clone(&http));
        let range = session.default_range().expect("range");

        let err = session.analyze("AAPL, $$$", range, 3).await.expect_err("must fail");

        assert!(matches!(err, ValidationError::InvalidSymbol { .. }));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn unreachable_providers_degrade_to_empty_state() {
        // Every URL is unmatched, so each call fails without retry.
        let http = Arc::new(ScriptedHttpClient::new());
        let fetcher = StockFetcher::new(Arc::new(YahooFinance::new(http.clone())))
            .with_retry(RetryConfig::no_retry())
            .with_listing_gate(RateGate::unlimited());
        let news = NewsAggregator::with_default_sources(http.clone(), 100)
            .with_rate_gate(RateGate::unlimited());
        let session = AnalysisSession::from_parts(TickerResolver::default(), fetcher, news);
        let range = session.default_range().expect("range");

        let analysis = session.analyze("TCS", range, 5).await.expect("valid symbol");

        assert_eq!(analysis.inputs.len(), 1);
        assert!(analysis.inputs[0].snapshot.is_err());
        assert!(analysis.inputs[0].news.is_empty());
        assert_eq!(analysis.inputs[0].news.outcomes.len(), 3);
        assert!(analysis.correlation.is_none());

        let report = session.render(&analysis, UtcDateTime::parse("2024-06-28T00:00:00Z").expect("valid"));
        assert_eq!(report.filename, "TCS.NS_report_2024-06-28.md");
        assert!(report.markdown.contains(crate::report::NOT_AVAILABLE));
    }

    #[tokio::test]
    async fn report_after_analysis_reuses_fetched_results() {
        let http = Arc::new(ScriptedHttpClient::new());
        let session = session(Arc::clone(&http));
        let range = session.default_range().expect("range");

        let analysis = session.analyze("AAPL", range, 5).await.expect("valid symbol");
        let requests_after_analysis = http.requests().len();
        assert_eq!(http.count(GOOGLE_NEWS), 1);

        let generated = UtcDateTime::parse("2024-06-28T00:00:00Z").expect("valid");
        let report = session.report("AAPL", range, 5, generated).await.expect("valid symbol");

        assert_eq!(http.count(GOOGLE_NEWS), 1);
        assert_eq!(http.requests().len(), requests_after_analysis);
        assert_eq!(report.markdown, session.render(&analysis, generated).markdown);
    }

    #[tokio::test]
    async fn market_data_never_waits_for_news() {
        let http = Arc::new(ScriptedHttpClient::new());
        let session = session(Arc::clone(&http));
        let range = session.default_range().expect("range");

        let market = session
            .market_data("TCS, INFY", range, CacheMode::Use)
            .await
            .expect("valid symbols");

        let symbols: Vec<&str> = market.tickers.iter().map(|data| data.ticker.symbol()).collect();
        assert_eq!(symbols, ["TCS.NS", "INFY.NS"]);
        assert_eq!(http.count(GOOGLE_NEWS), 0);
    }

    #[tokio::test]
    async fn refresh_refetches_cached_market_data() {
        let http = Arc::new(ScriptedHttpClient::new());
        let session = session(Arc::clone(&http));
        let range = session.default_range().expect("range");

        session.market_data("AAPL", range, CacheMode::Use).await.expect("valid");
        let first = http.requests().len();
        session.market_data("AAPL", range, CacheMode::Use).await.expect("valid");
        assert_eq!(http.requests().len(), first);

        session.market_data("AAPL", range, CacheMode::Refresh).await.expect("valid");
        assert!(http.requests().len() > first);
    }

    #[test]
    fn headlines_follow_the_listing_that_answered() {
        let requested = Ticker::listed("RELIANCE", crate::Market::Nse);
        let data = TickerData {
            ticker: requested.clone(),
            snapshot: Err(FetchError::DataUnavailable {
                symbol: requested.symbol().to_owned(),
                attempts: 1,
                reason: String::from("down"),
            }),
        };

        let query = data.news_query();

        assert_eq!(query.ticker, requested);
        assert_eq!(query.company_name, "RELIANCE");
    }
}
