//! Snapshot fetching with retry, listing fallback and a per-session cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{CacheMode, CacheStore};
use crate::error::FetchError;
use crate::market_data::{CompanyProfile, MarketDataSource, PriceHistory};
use crate::retry::RetryConfig;
use crate::source_error::{SourceError, SourceErrorKind};
use crate::throttling::RateGate;
use crate::{DateRange, FundamentalMetric, Market, PriceSeries, Quote, StockSnapshot, Ticker, UtcDateTime};

/// Default spacing between listing lookups.
pub const DEFAULT_LISTING_INTERVAL: Duration = Duration::from_secs(1);

/// Fetches [`StockSnapshot`]s from a [`MarketDataSource`].
///
/// Transient provider failures are retried per [`RetryConfig`]. When a
/// listing has no history, the same company is tried on its alternate
/// listings (NSE to BSE, unsuffixed US symbols to NSE then BSE). Every
/// listing lookup first waits on the listing [`RateGate`]. Exhaustion yields
/// [`FetchError::DataUnavailable`].
#[derive(Clone)]
pub struct StockFetcher {
    source: Arc<dyn MarketDataSource>,
    retry: RetryConfig,
    cache: CacheStore<StockSnapshot>,
    listing_fallback: bool,
    listing_gate: RateGate,
}

impl StockFetcher {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            retry: RetryConfig::default(),
            cache: CacheStore::disabled(),
            listing_fallback: true,
            listing_gate: RateGate::every(DEFAULT_LISTING_INTERVAL),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: CacheStore<StockSnapshot>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_listing_fallback(mut self, enabled: bool) -> Self {
        self.listing_fallback = enabled;
        self
    }

    pub fn with_listing_gate(mut self, gate: RateGate) -> Self {
        self.listing_gate = gate;
        self
    }

    pub async fn fetch(&self, ticker: &Ticker, range: DateRange) -> Result<StockSnapshot, FetchError> {
        self.fetch_with_mode(ticker, range, CacheMode::Use).await
    }

    pub async fn fetch_with_mode(
        &self,
        ticker: &Ticker,
        range: DateRange,
        mode: CacheMode,
    ) -> Result<StockSnapshot, FetchError> {
        let key = format!("{}|{}", ticker.symbol(), range.cache_key());
        if mode.reads() {
            if let Some(snapshot) = self.cache.get(&key).await {
                debug!(ticker = %ticker, "snapshot served from session cache");
                return Ok(snapshot);
            }
        }

        let snapshot = self.fetch_uncached(ticker, range).await?;
        if mode.writes() {
            self.cache.put(key, snapshot.clone()).await;
        }
        Ok(snapshot)
    }

    async fn fetch_uncached(&self, ticker: &Ticker, range: DateRange) -> Result<StockSnapshot, FetchError> {
        let mut attempts = 0_u32;
        let mut last_reason = String::from("no listing returned price history");

        for (index, candidate) in self.candidates(ticker).into_iter().enumerate() {
            if index > 0 {
                info!(requested = %ticker, fallback = %candidate, "trying alternate listing");
            }
            self.listing_gate.acquire().await;

            let source = self.source.as_ref();
            let listing = &candidate;
            let outcome = self
                .retrying("history", listing, &mut attempts, move || {
                    source.history(listing, range)
                })
                .await;

            match outcome {
                Ok(history) if !history.bars.is_empty() => {
                    let profile = self.fetch_profile(listing, &mut attempts).await;
                    let snapshot = build_snapshot(candidate, history, profile);
                    info!(
                        ticker = %snapshot.ticker,
                        bars = snapshot.series.len(),
                        fundamentals = snapshot.fundamentals.len(),
                        "fetched snapshot"
                    );
                    return Ok(snapshot);
                }
                Ok(_) => {
                    debug!(ticker = %candidate, "listing returned empty history");
                    last_reason = format!("'{candidate}' returned no price history");
                }
                Err(error) if error.kind() == SourceErrorKind::NotFound => {
                    debug!(ticker = %candidate, error = %error, "listing not found");
                    last_reason = error.to_string();
                }
                Err(error) => {
                    // Provider trouble, not a listing problem; other listings would fail the same way.
                    last_reason = error.to_string();
                    break;
                }
            }
        }

        warn!(ticker = %ticker, attempts, reason = %last_reason, "data unavailable");
        Err(FetchError::DataUnavailable {
            symbol: ticker.symbol().to_owned(),
            attempts,
            reason: last_reason,
        })
    }

    async fn fetch_profile(&self, ticker: &Ticker, attempts: &mut u32) -> CompanyProfile {
        let source = self.source.as_ref();
        match self
            .retrying("profile", ticker, attempts, move || source.profile(ticker))
            .await
        {
            Ok(profile) => profile,
            Err(error) => {
                warn!(ticker = %ticker, error = %error, "profile unavailable; fundamentals omitted");
                CompanyProfile::default()
            }
        }
    }

    /// Requested listing first, then alternates when fallback applies.
    fn candidates(&self, ticker: &Ticker) -> Vec<Ticker> {
        let mut candidates = vec![ticker.clone()];
        if !self.listing_fallback {
            return candidates;
        }

        match ticker.market() {
            Market::Nse => candidates.push(ticker.on_market(Market::Bse)),
            Market::Us if is_plain_symbol(ticker.symbol()) => {
                candidates.push(ticker.on_market(Market::Nse));
                candidates.push(ticker.on_market(Market::Bse));
            }
            Market::Us | Market::Bse => {}
        }
        candidates
    }

    async fn retrying<T, F, Fut>(
        &self,
        operation: &'static str,
        ticker: &Ticker,
        attempts: &mut u32,
        mut call: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            *attempts += 1;
            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= max_attempts || !self.is_transient(&error) {
                return Err(error);
            }

            let delay = self.retry.delay_for_attempt(attempt - 1);
            warn!(
                operation,
                ticker = %ticker,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient provider failure; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn is_transient(&self, error: &SourceError) -> bool {
        if let Some(status) = error.status() {
            return self.retry.should_retry_status(status);
        }
        if let Some(transport) = error.transport_error() {
            return self.retry.should_retry_transport(transport);
        }
        matches!(
            error.kind(),
            SourceErrorKind::RateLimited | SourceErrorKind::Unavailable
        )
    }
}

fn is_plain_symbol(symbol: &str) -> bool {
    symbol.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '&'))
}

fn build_snapshot(ticker: Ticker, history: PriceHistory, profile: CompanyProfile) -> StockSnapshot {
    let series = PriceSeries::new(history.bars);
    let meta = history.meta;
    let last_bar = series.last();
    let last_close = last_bar.map(|bar| bar.close).unwrap_or_default();
    let as_of = last_bar.map(|bar| bar.ts).unwrap_or_else(UtcDateTime::now);

    let company_name = profile
        .name
        .or(meta.name)
        .unwrap_or_else(|| ticker.base_symbol().to_owned());
    let currency = profile
        .currency
        .or(meta.currency)
        .map(|currency| currency.to_ascii_uppercase())
        .unwrap_or_else(|| ticker.market().default_currency().to_owned());
    let exchange = profile.exchange.or(meta.exchange);
    let price = profile
        .price
        .or(meta.regular_market_price)
        .filter(|price| price.is_finite() && *price >= 0.0)
        .unwrap_or(last_close);

    let quote = Quote::new(price, &currency, exchange.clone(), as_of)
        .or_else(|_| Quote::new(price, ticker.market().default_currency(), exchange.clone(), as_of))
        .unwrap_or_else(|_| Quote {
            price: last_close,
            currency: ticker.market().default_currency().to_owned(),
            exchange,
            as_of,
        });

    let mut fundamentals = profile.fundamentals;
    if fundamentals.get(FundamentalMetric::Volume).is_none() {
        if let Some(volume) = last_bar.and_then(|bar| bar.volume) {
            fundamentals.insert(FundamentalMetric::Volume, volume as f64);
        }
    }

    StockSnapshot {
        ticker,
        company_name,
        quote,
        series,
        fundamentals,
        fetched_at: UtcDateTime::now(),
    }
}
