use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use super::{CompanyProfile, ListingMeta, MarketDataSource, PriceHistory, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, DEFAULT_TIMEOUT_MS};
use crate::{DateRange, FundamentalMetric, Fundamentals, PriceBar, Ticker, UtcDateTime};

const REFERER: &str = "https://finance.yahoo.com/";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData";

// ============================================================================
// Cookie / crumb handshake
// ============================================================================

#[derive(Debug)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Yahoo's quoteSummary endpoint needs a session cookie from `fc.yahoo.com`
/// plus a crumb token bound to it. The cookie lives in the transport's jar;
/// this manager caches the crumb.
///
/// The lock is held across a refresh so concurrent callers wait for one
/// handshake instead of starting their own.
#[derive(Debug)]
pub struct YahooAuthManager {
    crumb: tokio::sync::Mutex<Option<CachedCrumb>>,
    ttl: Duration,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }
}

impl YahooAuthManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            crumb: tokio::sync::Mutex::new(None),
            ttl,
        }
    }

    /// Cached crumb, refreshed when missing or older than the TTL.
    pub async fn crumb(&self, http: &dyn HttpClient, timeout_ms: u64) -> Result<String, SourceError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            if crumb.fetched_at.elapsed() < self.ttl {
                return Ok(crumb.value.clone());
            }
        }

        let value = fetch_crumb(http, timeout_ms).await?;
        *cached = Some(CachedCrumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drops the cached crumb so the next call performs a fresh handshake.
    pub async fn invalidate(&self) {
        *self.crumb.lock().await = None;
    }
}

async fn fetch_crumb(http: &dyn HttpClient, timeout_ms: u64) -> Result<String, SourceError> {
    // The cookie response is usually a 404; only the Set-Cookie header matters.
    let cookie_request = HttpRequest::get(COOKIE_URL)
        .with_header("referer", REFERER)
        .with_timeout_ms(timeout_ms);
    http.execute(cookie_request)
        .await
        .map_err(SourceError::transport)?;

    for endpoint in CRUMB_URLS {
        let request = HttpRequest::get(endpoint)
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);

        let response = match http.execute(request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) if response.status == 429 => {
                return Err(SourceError::http_status(429, "rate limited while fetching crumb"));
            }
            Ok(response) => {
                debug!(endpoint, status = response.status, "crumb endpoint rejected request");
                continue;
            }
            Err(error) => {
                debug!(endpoint, error = %error, "crumb endpoint unreachable");
                continue;
            }
        };

        let body = response.body.trim();
        if body.contains("<html") || body.contains("<!DOCTYPE") {
            continue;
        }
        if body.to_ascii_lowercase().contains("too many requests") {
            return Err(SourceError::rate_limited("rate limited while fetching crumb"));
        }
        if !body.is_empty() && body.len() < 100 && !body.contains(char::is_whitespace) {
            return Ok(body.to_owned());
        }
    }

    Err(SourceError::unavailable("failed to fetch crumb from all endpoints"))
}

// ============================================================================
// Adapter
// ============================================================================

/// Yahoo Finance chart and quoteSummary adapter.
#[derive(Clone)]
pub struct YahooFinance {
    http: Arc<dyn HttpClient>,
    auth: Arc<YahooAuthManager>,
    timeout_ms: u64,
}

impl YahooFinance {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            auth: Arc::new(YahooAuthManager::default()),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, SourceError> {
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);
        self.http
            .execute(request)
            .await
            .map_err(SourceError::transport)
    }

    async fn fetch_history(&self, ticker: &Ticker, range: DateRange) -> Result<PriceHistory, SourceError> {
        let url = format!(
            "{CHART_URL}/{}?period1={}&period2={}&interval=1d&events=history",
            urlencoding::encode(ticker.symbol()),
            range.start().unix_timestamp(),
            range.end().unix_timestamp(),
        );
        debug!(ticker = %ticker, url = %url, "requesting chart");

        let response = self.get(&url).await?;
        if response.status == 404 {
            return Err(SourceError::not_found(format!(
                "no chart data for '{ticker}'"
            )));
        }
        if !response.is_success() {
            return Err(SourceError::http_status(
                response.status,
                format!("chart returned status {}", response.status),
            ));
        }

        parse_chart(&response.body)
    }

    async fn fetch_profile(&self, ticker: &Ticker) -> Result<CompanyProfile, SourceError> {
        let mut refreshed = false;
        loop {
            let crumb = self.auth.crumb(self.http.as_ref(), self.timeout_ms).await?;
            let url = format!(
                "{SUMMARY_URL}/{}?modules={SUMMARY_MODULES}&crumb={}",
                urlencoding::encode(ticker.symbol()),
                urlencoding::encode(&crumb),
            );
            debug!(ticker = %ticker, "requesting quote summary");

            let response = self.get(&url).await?;
            if matches!(response.status, 401 | 403) && !refreshed {
                warn!(ticker = %ticker, status = response.status, "crumb rejected; refreshing");
                self.auth.invalidate().await;
                refreshed = true;
                continue;
            }
            if !response.is_success() {
                return Err(SourceError::http_status(
                    response.status,
                    format!("quote summary returned status {}", response.status),
                ));
            }

            return parse_summary(&response.body);
        }
    }
}

impl MarketDataSource for YahooFinance {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn history<'a>(&'a self, ticker: &'a Ticker, range: DateRange) -> SourceFuture<'a, PriceHistory> {
        Box::pin(self.fetch_history(ticker, range))
    }

    fn profile<'a>(&'a self, ticker: &'a Ticker) -> SourceFuture<'a, CompanyProfile> {
        Box::pin(self.fetch_profile(ticker))
    }
}

// ============================================================================
// Response mapping
// ============================================================================

fn parse_chart(body: &str) -> Result<PriceHistory, SourceError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::invalid_response(format!("failed to parse chart: {e}")))?;

    if let Some(error) = response.chart.error {
        return Err(error.into_source_error());
    }

    let Some(result) = response.chart.result.and_then(|results| results.into_iter().next()) else {
        return Err(SourceError::not_found("chart response contained no result"));
    };

    let meta = ListingMeta {
        name: result.meta.long_name.or(result.meta.short_name),
        currency: result.meta.currency,
        exchange: result.meta.full_exchange_name.or(result.meta.exchange_name),
        regular_market_price: result.meta.regular_market_price,
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(PriceHistory { bars: Vec::new(), meta });
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped = 0_usize;
    for (i, &seconds) in timestamps.iter().enumerate() {
        let values = (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = values else {
            skipped += 1;
            continue;
        };

        let volume = value_at(&quote.volume, i)
            .filter(|volume| *volume >= 0.0)
            .map(|volume| volume as u64);
        let bar = UtcDateTime::from_unix_timestamp(seconds)
            .and_then(|ts| PriceBar::new(ts, open, high, low, close, volume));
        match bar {
            Ok(bar) => bars.push(bar),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, kept = bars.len(), "dropped incomplete chart rows");
    }

    Ok(PriceHistory { bars, meta })
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

fn parse_summary(body: &str) -> Result<CompanyProfile, SourceError> {
    let response: SummaryResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::invalid_response(format!("failed to parse quote summary: {e}"))
    })?;

    if let Some(error) = response.quote_summary.error {
        return Err(error.into_source_error());
    }

    let Some(result) = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
    else {
        return Err(SourceError::not_found("quote summary contained no result"));
    };

    let price = result.price.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.default_key_statistics.unwrap_or_default();
    let financial = result.financial_data.unwrap_or_default();

    let mut fundamentals = Fundamentals::new();
    let mut put = |metric: FundamentalMetric, value: Option<f64>| {
        if let Some(value) = value {
            fundamentals.insert(metric, value);
        }
    };
    put(FundamentalMetric::PeRatio, raw(&detail.trailing_pe));
    put(
        FundamentalMetric::ForwardPe,
        raw(&detail.forward_pe).or_else(|| raw(&stats.forward_pe)),
    );
    put(
        FundamentalMetric::DividendYield,
        raw(&detail.dividend_yield).map(|value| value * 100.0),
    );
    put(FundamentalMetric::PriceToBook, raw(&stats.price_to_book));
    put(FundamentalMetric::DebtToEquity, raw(&financial.debt_to_equity));
    put(
        FundamentalMetric::ReturnOnEquity,
        raw(&financial.return_on_equity).map(|value| value * 100.0),
    );
    put(
        FundamentalMetric::MarketCap,
        raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
    );
    put(
        FundamentalMetric::Volume,
        raw(&price.regular_market_volume).or_else(|| raw(&detail.volume)),
    );

    Ok(CompanyProfile {
        name: price.long_name.or(price.short_name),
        currency: price.currency,
        exchange: price.exchange_name,
        price: raw(&price.regular_market_price).or_else(|| raw(&financial.current_price)),
        fundamentals,
    })
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|value| value.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ApiError {
    fn into_source_error(self) -> SourceError {
        let code = self.code.unwrap_or_default();
        let message = format!(
            "provider error {code}: {}",
            self.description.unwrap_or_default()
        );
        if code.eq_ignore_ascii_case("not found") {
            SourceError::not_found(message)
        } else {
            SourceError::unavailable(message)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    exchange_name: Option<String>,
    full_exchange_name: Option<String>,
    regular_market_price: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatisticsModule>,
    #[serde(default)]
    financial_data: Option<FinancialDataModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    currency: Option<String>,
    exchange_name: Option<String>,
    regular_market_price: Option<RawValue>,
    regular_market_volume: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryDetailModule {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    #[serde(rename = "dividendYield")]
    dividend_yield: Option<RawValue>,
    #[serde(rename = "marketCap")]
    market_cap: Option<RawValue>,
    volume: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyStatisticsModule {
    #[serde(rename = "priceToBook")]
    price_to_book: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FinancialDataModule {
    debt_to_equity: Option<RawValue>,
    return_on_equity: Option<RawValue>,
    current_price: Option<RawValue>,
}

/// Numeric field wrapped as `{"raw": 1.0, "fmt": "1.00"}`; empty objects mean missing.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}
