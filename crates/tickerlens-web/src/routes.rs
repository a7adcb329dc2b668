//! Request handlers.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | Dashboard page |
//! | `GET /health` | `ok` |
//! | `GET /api/resolve?symbol=` | Resolved tickers, 422 on bad input |
//! | `GET /api/snapshot?symbols=&days=&refresh=` | Per-ticker market panels and correlation |
//! | `GET /api/news?symbols=&days=&max=` | Per-ticker headlines |
//! | `GET /api/report?symbols=&days=&max=` | Markdown attachment |
//!
//! The dashboard calls `snapshot` first and draws charts from it, then asks
//! for `news`. Both results stay in the visitor's session, so the report
//! that follows is rendered without new upstream requests.

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tickerlens_core::analysis::{
    fundamental_score, headline_sentiment, is_high_volatility, CorrelationMatrix, Sentiment,
};
use tickerlens_core::news::validate_headline_count;
use tickerlens_core::{
    AnalysisSession, CacheMode, DateRange, NewsDigest, StockSnapshot, Ticker, TickerData,
    UtcDateTime,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::page::DASHBOARD_HTML;
use crate::state::{AppState, SessionLease};

pub const SESSION_COOKIE: &str = "tickerlens_session";
pub const MAX_RANGE_DAYS: u32 = 3_650;

pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub input: String,
    pub tickers: Vec<Ticker>,
}

pub async fn resolve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ResolveParams>,
) -> ApiResult<Response> {
    let lease = state.session(session_id(&headers)).await;
    let tickers = lease.session.resolve(&params.symbol)?;
    Ok(respond(
        &lease,
        Json(ResolveResponse {
            input: params.symbol,
            tickers,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    #[serde(default)]
    pub symbols: String,
    pub days: Option<u32>,
    pub max: Option<usize>,
    /// Refetch market data instead of serving the session cache.
    #[serde(default)]
    pub refresh: bool,
}

/// Market outcome for one requested ticker.
#[derive(Debug, Serialize)]
pub struct TickerPanel {
    pub requested: Ticker,
    /// `ok` or `data_unavailable`.
    pub status: &'static str,
    pub message: Option<String>,
    pub snapshot: Option<StockSnapshot>,
    pub change_percent: Option<f64>,
    pub high_volatility: bool,
    pub fundamental_score: Option<u8>,
}

impl From<TickerData> for TickerPanel {
    fn from(data: TickerData) -> Self {
        match data.snapshot {
            Ok(snapshot) => {
                let change = (snapshot.series.len() >= 2).then(|| snapshot.change_percent());
                Self {
                    requested: data.ticker,
                    status: "ok",
                    message: None,
                    change_percent: change,
                    high_volatility: change.is_some_and(is_high_volatility),
                    fundamental_score: Some(fundamental_score(&snapshot)),
                    snapshot: Some(snapshot),
                }
            }
            Err(error) => Self {
                requested: data.ticker,
                status: "data_unavailable",
                message: Some(error.to_string()),
                snapshot: None,
                change_percent: None,
                high_volatility: false,
                fundamental_score: None,
            },
        }
    }
}

/// One correlated pair with its plain-language reading.
#[derive(Debug, Serialize)]
pub struct PairPanel {
    pub first: String,
    pub second: String,
    pub value: f64,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CorrelationPanel {
    #[serde(flatten)]
    pub matrix: CorrelationMatrix,
    pub pairs: Vec<PairPanel>,
}

impl From<CorrelationMatrix> for CorrelationPanel {
    fn from(matrix: CorrelationMatrix) -> Self {
        let pairs = matrix
            .pairs()
            .into_iter()
            .map(|pair| PairPanel {
                label: pair.label(),
                first: pair.first,
                second: pair.second,
                value: pair.value,
            })
            .collect();
        Self { matrix, pairs }
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub days: u32,
    pub tickers: Vec<TickerPanel>,
    pub correlation: Option<CorrelationPanel>,
}

/// Market data only. Never waits on a news source.
pub async fn snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AnalyzeParams>,
) -> ApiResult<Response> {
    let lease = state.session(session_id(&headers)).await;
    let (days, range) = request_range(&state, &params)?;
    let mode = if params.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    };

    let market = lease.session.market_data(&params.symbols, range, mode).await?;
    let body = SnapshotResponse {
        days,
        tickers: market.tickers.into_iter().map(TickerPanel::from).collect(),
        correlation: market.correlation.map(CorrelationPanel::from),
    };
    Ok(respond(&lease, Json(body)))
}

/// Headlines for one requested ticker.
#[derive(Debug, Serialize)]
pub struct NewsPanel {
    pub requested: Ticker,
    /// Listing the headlines were searched for.
    pub listing: Ticker,
    pub news: NewsDigest,
    pub sentiment: Option<Sentiment>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub tickers: Vec<NewsPanel>,
}

pub async fn news(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AnalyzeParams>,
) -> ApiResult<Response> {
    let lease = state.session(session_id(&headers)).await;
    let (_, range) = request_range(&state, &params)?;
    let max = headline_count(&lease.session, &params)?;

    let market = lease
        .session
        .market_data(&params.symbols, range, CacheMode::Use)
        .await?;
    let mut panels = Vec::with_capacity(market.tickers.len());
    for data in &market.tickers {
        let news = lease.session.headlines(data, max).await;
        panels.push(NewsPanel {
            requested: data.ticker.clone(),
            listing: data.news_query().ticker,
            sentiment: (!news.is_empty()).then(|| headline_sentiment(&news.items)),
            news,
        });
    }
    Ok(respond(&lease, Json(NewsResponse { tickers: panels })))
}

pub async fn report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AnalyzeParams>,
) -> ApiResult<Response> {
    let lease = state.session(session_id(&headers)).await;
    let (_, range) = request_range(&state, &params)?;
    let max = headline_count(&lease.session, &params)?;

    let report = lease
        .session
        .report(&params.symbols, range, max, UtcDateTime::now())
        .await?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", report.filename))
        .map_err(|_| ApiError::BadRequest(format!("unsupported filename '{}'", report.filename)))?;

    Ok(respond(
        &lease,
        (
            [
                (CONTENT_TYPE, HeaderValue::from_static("text/markdown; charset=utf-8")),
                (CONTENT_DISPOSITION, disposition),
            ],
            report.markdown,
        ),
    ))
}

fn request_range(state: &AppState, params: &AnalyzeParams) -> ApiResult<(u32, DateRange)> {
    let days = params.days.unwrap_or(state.config().range_days);
    if days == 0 || days > MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(format!(
            "days must be between 1 and {MAX_RANGE_DAYS}"
        )));
    }
    Ok((days, DateRange::last_days(days)?))
}

fn headline_count(session: &AnalysisSession, params: &AnalyzeParams) -> ApiResult<usize> {
    Ok(validate_headline_count(params.max.unwrap_or(session.max_headlines()))?)
}

/// Session id from the request's `Cookie` headers, if any.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn respond(lease: &SessionLease, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    if lease.is_new {
        let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", lease.id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    response
}
