//! Derived figures shown in the dashboard and reports.
//!
//! Everything here is a pure function of fetched data: period performance,
//! the volatility flag, close-price correlation, headline sentiment and the
//! fundamentals score.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::{FundamentalMetric, NewsItem, PriceSeries, StockSnapshot};

/// Absolute period change, in percent, above which a stock is flagged volatile.
pub const HIGH_VOLATILITY_PERCENT: f64 = 20.0;
/// Absolute correlation above which two stocks are flagged as moving together.
pub const HIGH_CORRELATION: f64 = 0.7;

const POSITIVE_KEYWORDS: [&str; 9] = [
    "growth", "profit", "revenue", "beat", "strong", "positive", "gain", "rise", "up",
];
const NEGATIVE_KEYWORDS: [&str; 8] = [
    "loss", "down", "fall", "weak", "decline", "drop", "negative", "concern",
];

/// Percent change from the first to the last close; zero with fewer than two bars.
pub fn period_change_percent(series: &PriceSeries) -> f64 {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 && first.close > 0.0 => {
            (last.close - first.close) / first.close * 100.0
        }
        _ => 0.0,
    }
}

pub fn is_high_volatility(change_percent: f64) -> bool {
    change_percent.abs() > HIGH_VOLATILITY_PERCENT
}

/// Pearson correlation coefficient; `None` when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        None
    } else {
        Some((cov / denom).clamp(-1.0, 1.0))
    }
}

/// Pairwise close-price correlation over the dates every series shares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    /// Row-major, `values[i][j]` correlates `symbols[i]` with `symbols[j]`.
    pub values: Vec<Vec<Option<f64>>>,
    pub common_dates: usize,
}

/// One off-diagonal entry of a [`CorrelationMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub first: String,
    pub second: String,
    pub value: f64,
}

impl CorrelationPair {
    pub fn label(&self) -> &'static str {
        correlation_label(self.value)
    }
}

impl CorrelationMatrix {
    pub fn get(&self, first: &str, second: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|symbol| symbol == first)?;
        let j = self.symbols.iter().position(|symbol| symbol == second)?;
        self.values[i][j]
    }

    /// Each unordered pair once, in symbol order. Undefined entries are skipped.
    pub fn pairs(&self) -> Vec<CorrelationPair> {
        let mut pairs = Vec::new();
        for (i, first) in self.symbols.iter().enumerate() {
            for (j, second) in self.symbols.iter().enumerate().skip(i + 1) {
                if let Some(value) = self.values[i][j] {
                    pairs.push(CorrelationPair {
                        first: first.clone(),
                        second: second.clone(),
                        value,
                    });
                }
            }
        }
        pairs
    }

    pub fn high_correlation_pairs(&self) -> Vec<CorrelationPair> {
        self.pairs()
            .into_iter()
            .filter(|pair| pair.value.abs() > HIGH_CORRELATION)
            .collect()
    }
}

/// Correlation of daily closes aligned on calendar date.
///
/// Returns `None` with fewer than two non-empty series or fewer than two
/// dates common to all of them.
pub fn correlation_matrix(snapshots: &[&StockSnapshot]) -> Option<CorrelationMatrix> {
    let priced: Vec<&StockSnapshot> = snapshots
        .iter()
        .copied()
        .filter(|snapshot| !snapshot.series.is_empty())
        .collect();
    if priced.len() < 2 {
        return None;
    }

    let by_date: Vec<BTreeMap<String, f64>> = priced
        .iter()
        .map(|snapshot| {
            snapshot
                .series
                .bars()
                .iter()
                .map(|bar| (bar.ts.format_date(), bar.close))
                .collect()
        })
        .collect();

    let mut common: HashSet<&String> = by_date[0].keys().collect();
    for closes in &by_date[1..] {
        common.retain(|date| closes.contains_key(*date));
    }
    if common.len() < 2 {
        return None;
    }

    let aligned: Vec<Vec<f64>> = by_date
        .iter()
        .map(|closes| {
            closes
                .iter()
                .filter(|(date, _)| common.contains(date))
                .map(|(_, close)| *close)
                .collect()
        })
        .collect();

    let size = aligned.len();
    let mut values = vec![vec![None; size]; size];
    for i in 0..size {
        for j in i..size {
            let value = pearson(&aligned[i], &aligned[j]);
            values[i][j] = value;
            values[j][i] = value;
        }
    }

    Some(CorrelationMatrix {
        symbols: priced
            .iter()
            .map(|snapshot| snapshot.ticker.symbol().to_owned())
            .collect(),
        values,
        common_dates: common.len(),
    })
}

pub fn correlation_label(value: f64) -> &'static str {
    if value > 0.7 {
        "strong positive correlation"
    } else if value > 0.3 {
        "moderate positive correlation"
    } else if value > -0.3 {
        "weak correlation"
    } else if value > -0.7 {
        "moderate negative correlation"
    } else {
        "strong negative correlation"
    }
}

/// Overall tone of a set of headlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
}

impl Sentiment {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Positive => "predominantly positive",
            Self::Negative => "predominantly negative",
            Self::Mixed => "mixed",
        }
    }
}

/// Keyword-count sentiment. Matching is substring based, so "up" also counts
/// inside "upgrade".
pub fn headline_sentiment(items: &[NewsItem]) -> Sentiment {
    let count = |keywords: &[&str]| -> usize {
        items
            .iter()
            .map(|item| item.headline.to_lowercase())
            .map(|headline| keywords.iter().filter(|keyword| headline.contains(*keyword)).count())
            .sum()
    };

    let positive = count(&POSITIVE_KEYWORDS);
    let negative = count(&NEGATIVE_KEYWORDS);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Mixed,
    }
}

/// One point each for P/E under 25, ROE over 10% and a positive period change.
pub fn fundamental_score(snapshot: &StockSnapshot) -> u8 {
    let fundamentals = &snapshot.fundamentals;
    let mut score = 0;
    if fundamentals
        .get(FundamentalMetric::PeRatio)
        .is_some_and(|pe| pe < 25.0)
    {
        score += 1;
    }
    if fundamentals
        .get(FundamentalMetric::ReturnOnEquity)
        .is_some_and(|roe| roe > 10.0)
    {
        score += 1;
    }
    if snapshot.change_percent() > 0.0 {
        score += 1;
    }
    score
}

pub fn is_fundamentally_strong(snapshot: &StockSnapshot) -> bool {
    fundamental_score(snapshot) >= 2
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::{
        Fundamentals, PriceBar, PriceSeries, Quote, StockSnapshot, TickerResolver, UtcDateTime,
    };

    const DAY: i64 = 86_400;
    const START: i64 = 1_704_153_600; // 2024-01-02T00:00:00Z

    pub(crate) fn series(closes: &[f64]) -> PriceSeries {
        series_from(0, closes)
    }

    pub(crate) fn series_from(first_day: i64, closes: &[f64]) -> PriceSeries {
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(offset, close)| {
                    let ts = UtcDateTime::from_unix_timestamp(START + (first_day + offset as i64) * DAY)
                        .expect("valid timestamp");
                    PriceBar::new(ts, *close, *close, *close, *close, Some(1_000)).expect("valid bar")
                })
                .collect(),
        )
    }

    pub(crate) fn snapshot(symbol: &str, series: PriceSeries, fundamentals: Fundamentals) -> StockSnapshot {
        let ticker = TickerResolver::default().resolve(symbol).expect("valid symbol");
        let as_of = UtcDateTime::from_unix_timestamp(START).expect("valid timestamp");
        let price = series.last().map_or(0.0, |bar| bar.close);
        StockSnapshot {
            quote: Quote::new(price, ticker.market().default_currency(), None, as_of).expect("valid quote"),
            company_name: format!("{symbol} Inc"),
            ticker,
            series,
            fundamentals,
            fetched_at: as_of,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{series, series_from, snapshot};
    use super::*;
    use crate::Fundamentals;

    #[test]
    fn period_change_uses_first_and_last_close() {
        assert!((period_change_percent(&series(&[100.0, 90.0, 125.0])) - 25.0).abs() < 1e-9);
        assert_eq!(period_change_percent(&series(&[100.0])), 0.0);
        assert_eq!(period_change_percent(&PriceSeries::default()), 0.0);
    }

    #[test]
    fn volatility_flag_is_strictly_above_twenty_percent() {
        assert!(is_high_volatility(-20.5));
        assert!(!is_high_volatility(20.0));
    }

    #[test]
    fn identical_series_correlate_perfectly() {
        let a = snapshot("AAPL", series(&[1.0, 2.0, 3.0, 5.0]), Fundamentals::new());
        let b = snapshot("MSFT", series(&[1.0, 2.0, 3.0, 5.0]), Fundamentals::new());

        let matrix = correlation_matrix(&[&a, &b]).expect("enough data");

        let value = matrix.get("AAPL", "MSFT").expect("defined");
        assert!((value - 1.0).abs() < 1e-9);
        assert_eq!(matrix.pairs().len(), 1);
        assert_eq!(matrix.high_correlation_pairs().len(), 1);
    }

    #[test]
    fn correlation_aligns_on_common_dates() {
        // Second series starts two days later; only days 2..=4 overlap.
        let a = snapshot("AAPL", series(&[50.0, 10.0, 1.0, 2.0, 3.0]), Fundamentals::new());
        let b = snapshot("MSFT", series_from(2, &[3.0, 2.0, 1.0]), Fundamentals::new());

        let matrix = correlation_matrix(&[&a, &b]).expect("enough data");

        assert_eq!(matrix.common_dates, 3);
        let value = matrix.get("AAPL", "MSFT").expect("defined");
        assert!((value + 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_needs_two_series() {
        let a = snapshot("AAPL", series(&[1.0, 2.0]), Fundamentals::new());
        let empty = snapshot("MSFT", PriceSeries::default(), Fundamentals::new());
        assert!(correlation_matrix(&[&a, &empty]).is_none());
    }

    #[test]
    fn flat_series_has_undefined_correlation() {
        let a = snapshot("AAPL", series(&[1.0, 2.0, 3.0]), Fundamentals::new());
        let flat = snapshot("MSFT", series(&[4.0, 4.0, 4.0]), Fundamentals::new());

        let matrix = correlation_matrix(&[&a, &flat]).expect("enough data");

        assert_eq!(matrix.get("AAPL", "MSFT"), None);
        assert!(matrix.pairs().is_empty());
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(correlation_label(0.71), "strong positive correlation");
        assert_eq!(correlation_label(0.5), "moderate positive correlation");
        assert_eq!(correlation_label(0.0), "weak correlation");
        assert_eq!(correlation_label(-0.5), "moderate negative correlation");
        assert_eq!(correlation_label(-0.9), "strong negative correlation");
    }

    #[test]
    fn sentiment_counts_keywords() {
        let items = |headlines: &[&str]| -> Vec<NewsItem> {
            headlines.iter().map(|h| NewsItem::new(*h, "test", "")).collect()
        };

        assert_eq!(
            headline_sentiment(&items(&["Profit growth beats estimates"])),
            Sentiment::Positive
        );
        assert_eq!(
            headline_sentiment(&items(&["Shares fall on weak demand"])),
            Sentiment::Negative
        );
        assert_eq!(headline_sentiment(&items(&["Company holds AGM"])), Sentiment::Mixed);
        assert_eq!(headline_sentiment(&[]), Sentiment::Mixed);
    }

    #[test]
    fn fundamental_score_combines_pe_roe_and_trend() {
        let strong = snapshot(
            "AAPL",
            series(&[100.0, 110.0]),
            Fundamentals::new()
                .with(FundamentalMetric::PeRatio, 18.0)
                .with(FundamentalMetric::ReturnOnEquity, 4.0),
        );
        let weak = snapshot(
            "MSFT",
            series(&[100.0, 90.0]),
            Fundamentals::new().with(FundamentalMetric::PeRatio, 40.0),
        );

        assert_eq!(fundamental_score(&strong), 2);
        assert!(is_fundamentally_strong(&strong));
        assert_eq!(fundamental_score(&weak), 0);
        assert!(!is_fundamentally_strong(&weak));
    }
}
