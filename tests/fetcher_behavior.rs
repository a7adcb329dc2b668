//! Behavior-driven tests for snapshot fetching
//!
//! These tests verify HOW the fetcher reacts to provider responses: transient
//! failures are retried, missing listings fall back to alternates, exhausted
//! attempts become `DataUnavailable`, and the session cache avoids repeat calls.
//! All HTTP traffic is scripted; nothing leaves the process.

use std::sync::Arc;
use std::time::Duration;

use tickerlens_core::{
    CacheMode, CacheStore, DateRange, FetchError, FundamentalMetric, HttpError, HttpResponse,
    Market, RateGate, RetryConfig, ScriptedHttpClient, StockFetcher, TickerResolver,
    UtcDateTime, YahooFinance,
};

const CHART: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";
const COOKIE: &str = "https://fc.yahoo.com";
const CRUMB: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const SUMMARY: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary/";

const CHART_BODY: &str = r#"{"chart":{"result":[{
    "meta":{"currency":"INR","exchangeName":"NSI","regularMarketPrice":3960.0,"longName":"Tata Consultancy Services Limited"},
    "timestamp":[1704153600,1704240000,1704326400],
    "indicators":{"quote":[{
        "open":[3800.0,3850.0,3900.0],
        "high":[3860.0,3900.0,3970.0],
        "low":[3790.0,3840.0,3890.0],
        "close":[3850.0,3890.0,3960.0],
        "volume":[120000,98000,143000]}]}}],"error":null}}"#;

const EMPTY_CHART_BODY: &str = r#"{"chart":{"result":[{
    "meta":{"currency":"INR"},
    "timestamp":[],
    "indicators":{"quote":[{"open":[],"high":[],"low":[],"close":[],"volume":[]}]}}],"error":null}}"#;

const SUMMARY_BODY: &str = r#"{"quoteSummary":{"result":[{
    "price":{"longName":"Tata Consultancy Services Limited","currency":"INR","exchangeName":"NSE","regularMarketPrice":{"raw":3960.0}},
    "summaryDetail":{"trailingPE":{"raw":30.2},"dividendYield":{"raw":0.012}},
    "defaultKeyStatistics":{"priceToBook":{"raw":14.1}},
    "financialData":{"returnOnEquity":{"raw":0.48}}
}],"error":null}}"#;

fn range() -> DateRange {
    DateRange::new(
        UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid"),
        UtcDateTime::parse("2024-01-05T00:00:00Z").expect("valid"),
    )
    .expect("valid range")
}

fn fetcher(http: &Arc<ScriptedHttpClient>, retry: RetryConfig) -> StockFetcher {
    StockFetcher::new(Arc::new(YahooFinance::new(http.clone())))
        .with_retry(retry)
        .with_listing_gate(RateGate::unlimited())
}

fn quick_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::fixed(Duration::from_millis(1), max_retries)
}

fn unavailable() -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::new(503, "Service Unavailable"))
}

// =============================================================================
// Fetching: successful responses
// =============================================================================

#[tokio::test]
async fn when_chart_and_summary_answer_system_builds_a_full_snapshot() {
    // Given: Yahoo answers the chart, the cookie/crumb handshake and the summary
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond_ok(CHART, CHART_BODY)
            .respond(COOKIE, Ok(HttpResponse::new(404, "")))
            .respond_ok(CRUMB, "crumb123")
            .respond_ok(SUMMARY, SUMMARY_BODY),
    );
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    // When: The snapshot is fetched
    let snapshot = fetcher(&http, quick_retry(2))
        .fetch(&ticker, range())
        .await
        .expect("snapshot available");

    // Then: Prices, quote and fundamentals are populated
    assert_eq!(snapshot.ticker.symbol(), "TCS.NS");
    assert_eq!(snapshot.company_name, "Tata Consultancy Services Limited");
    assert_eq!(snapshot.series.len(), 3);
    assert_eq!(snapshot.quote.currency, "INR");
    assert_eq!(snapshot.currency_symbol(), "₹");
    assert_eq!(snapshot.fundamentals.get(FundamentalMetric::PeRatio), Some(30.2));
    assert_eq!(snapshot.fundamentals.get(FundamentalMetric::Volume), Some(143_000.0));

    let summary_request = http
        .requests()
        .into_iter()
        .find(|request| request.url.starts_with(SUMMARY))
        .expect("summary requested");
    assert!(summary_request.url.contains("crumb=crumb123"));
}

#[tokio::test]
async fn when_fundamentals_are_unavailable_system_still_returns_prices() {
    // Given: Only the chart endpoint answers
    let http = Arc::new(ScriptedHttpClient::new().respond_ok(CHART, CHART_BODY));
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    // When: The snapshot is fetched
    let snapshot = fetcher(&http, RetryConfig::no_retry())
        .fetch(&ticker, range())
        .await
        .expect("snapshot available");

    // Then: The chart metadata fills the gaps and ratios are absent
    assert_eq!(snapshot.company_name, "Tata Consultancy Services Limited");
    assert_eq!(snapshot.quote.price, 3960.0);
    assert!(!snapshot.fundamentals.has_ratios());
}

// =============================================================================
// Fetching: retry behavior
// =============================================================================

#[tokio::test]
async fn when_provider_fails_transiently_system_retries_until_success() {
    // Given: Two 503 responses followed by a valid chart
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond(CHART, unavailable())
            .respond(CHART, unavailable())
            .respond_ok(CHART, CHART_BODY),
    );
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    // When: The snapshot is fetched with two retries allowed
    let result = fetcher(&http, quick_retry(2)).fetch(&ticker, range()).await;

    // Then: The third attempt succeeds
    assert!(result.is_ok());
    assert_eq!(http.count(CHART), 3);
}

#[tokio::test]
async fn when_provider_keeps_failing_system_reports_data_unavailable() {
    // Given: The chart endpoint always answers 503
    let http = Arc::new(ScriptedHttpClient::new().respond(CHART, unavailable()));
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    // When: The snapshot is fetched with two retries allowed
    let error = fetcher(&http, quick_retry(2))
        .fetch(&ticker, range())
        .await
        .expect_err("must be unavailable");

    // Then: Exactly max_retries + 1 attempts were made, and no fallback was tried
    let FetchError::DataUnavailable {
        symbol, attempts, ..
    } = &error;
    assert_eq!(symbol, "TCS.NS");
    assert_eq!(*attempts, 3);
    assert_eq!(http.count(CHART), 3);
    assert_eq!(http.count(&format!("{CHART}TCS.BO")), 0);
}

#[tokio::test]
async fn when_provider_rejects_the_request_system_does_not_retry() {
    // Given: A client error that retrying cannot fix
    let http = Arc::new(
        ScriptedHttpClient::new().respond(CHART, Ok(HttpResponse::new(400, "Bad Request"))),
    );
    let ticker = TickerResolver::default().resolve("AAPL").expect("valid");

    // When: The snapshot is fetched
    let result = fetcher(&http, quick_retry(3)).fetch(&ticker, range()).await;

    // Then: One attempt only
    assert!(result.is_err());
    assert_eq!(http.count(CHART), 1);
}

// =============================================================================
// Fetching: listing fallback
// =============================================================================

#[tokio::test]
async fn when_nse_listing_has_no_history_system_falls_back_to_bse() {
    // Given: NSE returns an empty chart and BSE has data
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond_ok(format!("{CHART}TCS.NS"), EMPTY_CHART_BODY)
            .respond_ok(format!("{CHART}TCS.BO"), CHART_BODY),
    );
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    // When: The snapshot is fetched
    let snapshot = fetcher(&http, RetryConfig::no_retry())
        .fetch(&ticker, range())
        .await
        .expect("fallback listing answers");

    // Then: The snapshot names the listing that answered
    assert_eq!(snapshot.ticker.symbol(), "TCS.BO");
    assert_eq!(snapshot.ticker.market(), Market::Bse);
}

#[tokio::test]
async fn when_us_symbol_is_unknown_system_tries_indian_listings() {
    // Given: The plain symbol is not found but the NSE listing exists
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond(format!("{CHART}IRFC?"), Ok(HttpResponse::new(404, "")))
            .respond_ok(format!("{CHART}IRFC.NS"), CHART_BODY),
    );
    let ticker = TickerResolver::new(Vec::<String>::new())
        .with_long_symbol_threshold(None)
        .resolve("IRFC")
        .expect("valid");
    assert_eq!(ticker.market(), Market::Us);

    // When: The snapshot is fetched
    let snapshot = fetcher(&http, RetryConfig::no_retry())
        .fetch(&ticker, range())
        .await
        .expect("NSE listing answers");

    // Then: The NSE listing is used
    assert_eq!(snapshot.ticker.symbol(), "IRFC.NS");
}

#[tokio::test]
async fn when_fallback_is_disabled_system_reports_the_requested_listing_only() {
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond_ok(format!("{CHART}TCS.NS"), EMPTY_CHART_BODY)
            .respond_ok(format!("{CHART}TCS.BO"), CHART_BODY),
    );
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    let result = fetcher(&http, RetryConfig::no_retry())
        .with_listing_fallback(false)
        .fetch(&ticker, range())
        .await;

    assert!(matches!(result, Err(FetchError::DataUnavailable { .. })));
    assert_eq!(http.count(&format!("{CHART}TCS.BO")), 0);
}

// =============================================================================
// Fetching: session cache
// =============================================================================

#[tokio::test]
async fn when_snapshot_is_requested_twice_system_serves_the_cached_copy() {
    // Given: A fetcher with a one-minute cache
    let http = Arc::new(ScriptedHttpClient::new().respond_ok(CHART, CHART_BODY));
    let fetcher = fetcher(&http, RetryConfig::no_retry())
        .with_cache(CacheStore::new(Duration::from_secs(60)));
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    // When: The same snapshot is requested twice
    let first = fetcher.fetch(&ticker, range()).await.expect("first fetch");
    let second = fetcher.fetch(&ticker, range()).await.expect("second fetch");

    // Then: Only one chart request was made
    assert_eq!(first, second);
    assert_eq!(http.count(CHART), 1);
}

#[tokio::test]
async fn when_refresh_is_requested_system_bypasses_the_cached_copy() {
    let http = Arc::new(ScriptedHttpClient::new().respond_ok(CHART, CHART_BODY));
    let fetcher = fetcher(&http, RetryConfig::no_retry())
        .with_cache(CacheStore::new(Duration::from_secs(60)));
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    fetcher.fetch(&ticker, range()).await.expect("first fetch");
    fetcher
        .fetch_with_mode(&ticker, range(), CacheMode::Refresh)
        .await
        .expect("refresh");

    assert_eq!(http.count(CHART), 2);
}

#[tokio::test]
async fn when_fetch_fails_system_does_not_cache_the_failure() {
    // Given: A failure, then a valid chart
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond(CHART, Ok(HttpResponse::new(400, "")))
            .respond_ok(CHART, CHART_BODY),
    );
    let fetcher = fetcher(&http, RetryConfig::no_retry())
        .with_listing_fallback(false)
        .with_cache(CacheStore::new(Duration::from_secs(60)));
    let ticker = TickerResolver::default().resolve("TCS").expect("valid");

    // When: The snapshot is requested twice
    let first = fetcher.fetch(&ticker, range()).await;
    let second = fetcher.fetch(&ticker, range()).await;

    // Then: The second request reaches the provider again
    assert!(first.is_err());
    assert!(second.is_ok());
}
