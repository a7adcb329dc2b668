use serde::{Deserialize, Serialize};

use crate::UtcDateTime;

/// A single headline plus its source metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub source: String,
    pub published_at: Option<UtcDateTime>,
    pub url: String,
}

impl NewsItem {
    pub fn new(headline: impl Into<String>, source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            source: source.into(),
            published_at: None,
            url: url.into(),
        }
    }

    pub fn with_published_at(mut self, published_at: UtcDateTime) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// What happened when one news source was queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Returned { source: String, headlines: usize },
    Empty { source: String },
    Failed { source: String, reason: String },
    TimedOut { source: String, timeout_ms: u64 },
}

impl SourceOutcome {
    pub fn source(&self) -> &str {
        match self {
            Self::Returned { source, .. }
            | Self::Empty { source }
            | Self::Failed { source, .. }
            | Self::TimedOut { source, .. } => source,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Returned { .. })
    }
}

/// Deduplicated, ordered headlines gathered for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewsDigest {
    pub items: Vec<NewsItem>,
    pub requested: usize,
    pub outcomes: Vec<SourceOutcome>,
}

impl NewsDigest {
    pub fn empty(requested: usize) -> Self {
        Self {
            items: Vec::new(),
            requested,
            outcomes: Vec::new(),
        }
    }

    /// Fewer headlines than requested. Not an error; rendered as "no news found"
    /// when nothing came back at all.
    pub fn is_partial(&self) -> bool {
        self.items.len() < self.requested
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
