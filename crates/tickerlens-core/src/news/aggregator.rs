use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::text::normalize_key;
use super::{BingNews, GoogleNews, NewsQuery, NewsSource, YahooFinanceNews, PER_SOURCE_CAP};
use crate::http_client::HttpClient;
use crate::throttling::RateGate;
use crate::{NewsDigest, SourceOutcome, ValidationError};

pub const DEFAULT_MAX_HEADLINES: usize = 10;
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SOURCE_INTERVAL: Duration = Duration::from_secs(1);

/// Queries news sources in priority order and merges their headlines.
///
/// Aggregation never fails. Each source outcome is recorded on the returned
/// [`NewsDigest`], so callers can tell "no news" apart from "every source
/// was down".
#[derive(Clone)]
pub struct NewsAggregator {
    sources: Vec<Arc<dyn NewsSource>>,
    source_timeout: Duration,
    per_source_cap: usize,
    gate: RateGate,
}

impl NewsAggregator {
    pub fn new(sources: Vec<Arc<dyn NewsSource>>) -> Self {
        Self {
            sources,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            per_source_cap: PER_SOURCE_CAP,
            gate: RateGate::every(DEFAULT_SOURCE_INTERVAL),
        }
    }

    /// Google News, then Yahoo Finance, then Bing News, all over `http`.
    pub fn with_default_sources(http: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self::new(vec![
            Arc::new(GoogleNews::new(Arc::clone(&http)).with_timeout_ms(timeout_ms)),
            Arc::new(YahooFinanceNews::new(Arc::clone(&http)).with_timeout_ms(timeout_ms)),
            Arc::new(BingNews::new(http).with_timeout_ms(timeout_ms)),
        ])
        .with_source_timeout(Duration::from_millis(timeout_ms))
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_per_source_cap(mut self, cap: usize) -> Self {
        self.per_source_cap = cap.max(1);
        self
    }

    pub fn with_rate_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// Up to `max` unique headlines for `query`.
    ///
    /// A `max` of zero is treated as one.
    pub async fn aggregate(&self, query: &NewsQuery, max: usize) -> NewsDigest {
        let max = max.max(1);
        let mut digest = NewsDigest::empty(max);
        let mut seen = HashSet::new();
        let timeout_ms = u64::try_from(self.source_timeout.as_millis()).unwrap_or(u64::MAX);

        for source in &self.sources {
            if digest.items.len() >= max {
                break;
            }

            self.gate.acquire().await;
            let name = source.name().to_owned();
            debug!(source = %name, ticker = %query.ticker, "querying news source");

            let fetched =
                tokio::time::timeout(self.source_timeout, source.fetch(query, self.per_source_cap)).await;
            let outcome = match fetched {
                Err(_) => {
                    warn!(source = %name, timeout_ms, "news source timed out");
                    SourceOutcome::TimedOut {
                        source: name,
                        timeout_ms,
                    }
                }
                Ok(Err(error)) => {
                    warn!(source = %name, error = %error, "news source failed");
                    SourceOutcome::Failed {
                        source: name,
                        reason: error.to_string(),
                    }
                }
                Ok(Ok(items)) if items.is_empty() => {
                    debug!(source = %name, "news source returned no headlines");
                    SourceOutcome::Empty { source: name }
                }
                Ok(Ok(items)) => {
                    let headlines = items.len();
                    for item in items {
                        if item.headline.is_empty() {
                            continue;
                        }
                        if seen.insert(normalize_key(&item.headline)) {
                            digest.items.push(item);
                        }
                    }
                    SourceOutcome::Returned {
                        source: name,
                        headlines,
                    }
                }
            };
            digest.outcomes.push(outcome);
        }

        digest.items.truncate(max);
        debug!(
            ticker = %query.ticker,
            headlines = digest.items.len(),
            partial = digest.is_partial(),
            "news aggregation finished"
        );
        digest
    }
}

/// Rejects a zero headline count supplied by a user.
pub fn validate_headline_count(max: usize) -> Result<usize, ValidationError> {
    if max == 0 {
        Err(ValidationError::InvalidHeadlineCount)
    } else {
        Ok(max)
    }
}
