use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Ticker, UtcDateTime, ValidationError};

/// Default history window, roughly six months of daily bars.
pub const DEFAULT_RANGE_DAYS: u32 = 180;

/// Half-open time range `[start, end)` for a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: UtcDateTime,
    end: UtcDateTime,
}

impl DateRange {
    pub fn new(start: UtcDateTime, end: UtcDateTime) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidDateRange {
                start: start.format_rfc3339(),
                end: end.format_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to `end`.
    pub fn ending_at(end: UtcDateTime, days: u32) -> Result<Self, ValidationError> {
        let start = end
            .checked_sub_days(days)
            .ok_or_else(|| ValidationError::InvalidDateRange {
                start: format!("{days} days before {end}"),
                end: end.format_rfc3339(),
            })?;
        Self::new(start, end)
    }

    pub fn last_days(days: u32) -> Result<Self, ValidationError> {
        Self::ending_at(UtcDateTime::now(), days)
    }

    pub const fn start(&self) -> UtcDateTime {
        self.start
    }

    pub const fn end(&self) -> UtcDateTime {
        self.end
    }

    /// Day-granular key so repeated requests within one day share cache entries.
    pub fn cache_key(&self) -> String {
        format!("{}..{}", self.start.format_date(), self.end.format_date())
    }
}

/// Daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl PriceBar {
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Chronologically ordered bars with unique timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts bars by time. When two bars share a timestamp the later one in
    /// `bars` wins.
    pub fn new(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|bar| bar.ts);

        let mut ordered: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match ordered.last_mut() {
                Some(last) if last.ts == bar.ts => *last = bar,
                _ => ordered.push(bar),
            }
        }

        Self { bars: ordered }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&PriceBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().map(|bar| bar.close)
    }

    pub fn high(&self) -> Option<f64> {
        self.bars.iter().map(|bar| bar.high).reduce(f64::max)
    }

    pub fn low(&self) -> Option<f64> {
        self.bars.iter().map(|bar| bar.low).reduce(f64::min)
    }
}

/// Latest price and listing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub currency: String,
    pub exchange: Option<String>,
    pub as_of: UtcDateTime,
}

impl Quote {
    pub fn new(
        price: f64,
        currency: impl AsRef<str>,
        exchange: Option<String>,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        Ok(Self {
            price,
            currency: validate_currency_code(currency.as_ref())?,
            exchange,
            as_of,
        })
    }
}

/// Fundamental metrics reported per company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundamentalMetric {
    PeRatio,
    ForwardPe,
    DividendYield,
    PriceToBook,
    DebtToEquity,
    ReturnOnEquity,
    MarketCap,
    Volume,
}

impl FundamentalMetric {
    /// Ratios shown in the fundamentals table, in column order.
    pub const RATIOS: [Self; 6] = [
        Self::PeRatio,
        Self::ForwardPe,
        Self::DividendYield,
        Self::PriceToBook,
        Self::DebtToEquity,
        Self::ReturnOnEquity,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::PeRatio => "P/E Ratio",
            Self::ForwardPe => "Forward P/E",
            Self::DividendYield => "Dividend Yield",
            Self::PriceToBook => "Price-to-Book",
            Self::DebtToEquity => "Debt/Equity",
            Self::ReturnOnEquity => "ROE",
            Self::MarketCap => "Market Cap",
            Self::Volume => "Volume",
        }
    }

    /// Values stored as percentages rather than plain ratios.
    pub const fn is_percent(self) -> bool {
        matches!(self, Self::DividendYield | Self::ReturnOnEquity)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::PeRatio => {
                "Price relative to trailing twelve-month earnings per share. Lower values can \
                 indicate cheaper valuation; very high values often price in growth."
            }
            Self::ForwardPe => {
                "Price relative to projected earnings over the next twelve months."
            }
            Self::DividendYield => "Annual dividends as a percentage of the share price.",
            Self::PriceToBook => {
                "Market value relative to book value. Values below 1 can indicate the stock \
                 trades under its accounting value."
            }
            Self::DebtToEquity => {
                "Total debt relative to shareholder equity. Higher values indicate more leverage."
            }
            Self::ReturnOnEquity => {
                "Net income as a percentage of shareholder equity. Above 15% is generally \
                 considered strong."
            }
            Self::MarketCap => "Total market value of outstanding shares.",
            Self::Volume => "Shares traded in the most recent session.",
        }
    }
}

/// Ordered map of fundamental metrics. Non-finite values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fundamentals {
    values: BTreeMap<FundamentalMetric, f64>,
}

impl Fundamentals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: FundamentalMetric, value: f64) {
        if value.is_finite() {
            self.values.insert(metric, value);
        }
    }

    pub fn with(mut self, metric: FundamentalMetric, value: f64) -> Self {
        self.insert(metric, value);
        self
    }

    pub fn get(&self, metric: FundamentalMetric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FundamentalMetric, f64)> + '_ {
        self.values.iter().map(|(metric, value)| (*metric, *value))
    }

    /// Whether any of the ratio metrics is present.
    pub fn has_ratios(&self) -> bool {
        FundamentalMetric::RATIOS
            .iter()
            .any(|metric| self.values.contains_key(metric))
    }
}

/// Point-in-time bundle of price history and fundamentals for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSnapshot {
    pub ticker: Ticker,
    pub company_name: String,
    pub quote: Quote,
    pub series: PriceSeries,
    pub fundamentals: Fundamentals,
    pub fetched_at: UtcDateTime,
}

impl StockSnapshot {
    /// Percent change from the first to the last close of the series.
    pub fn change_percent(&self) -> f64 {
        crate::analysis::period_change_percent(&self.series)
    }

    pub fn currency_symbol(&self) -> &'static str {
        if self.quote.currency == "INR" {
            "₹"
        } else {
            "$"
        }
    }
}

fn validate_currency_code(value: &str) -> Result<String, ValidationError> {
    if value.len() == 3 && value.chars().all(|ch| ch.is_ascii_uppercase()) {
        Ok(value.to_owned())
    } else {
        Err(ValidationError::InvalidCurrency {
            value: value.to_owned(),
        })
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
