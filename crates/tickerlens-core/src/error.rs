use std::path::PathBuf;

use thiserror::Error;

/// Why a raw ticker string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolIssue {
    Empty,
    TooLong { len: usize, max: usize },
    InvalidChar { ch: char, index: usize },
}

impl std::fmt::Display for SymbolIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("symbol cannot be empty"),
            Self::TooLong { len, max } => write!(f, "symbol length {len} exceeds max {max}"),
            Self::InvalidChar { ch, index } => {
                write!(f, "invalid character '{ch}' at index {index}")
            }
        }
    }
}

/// Validation errors raised while building domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid symbol '{input}': {issue}")]
    InvalidSymbol { input: String, issue: SymbolIssue },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("date range start {start} must be before end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,

    #[error("headline count must be at least 1")]
    InvalidHeadlineCount,
}

impl ValidationError {
    pub(crate) fn invalid_symbol(input: &str, issue: SymbolIssue) -> Self {
        Self::InvalidSymbol {
            input: input.to_owned(),
            issue,
        }
    }
}

/// Failure returned by the stock fetcher once every attempt is exhausted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("data unavailable for '{symbol}' after {attempts} attempt(s): {reason}")]
    DataUnavailable {
        symbol: String,
        attempts: u32,
        reason: String,
    },
}

impl FetchError {
    pub fn symbol(&self) -> &str {
        match self {
            Self::DataUnavailable { symbol, .. } => symbol,
        }
    }
}

/// Errors raised while loading configuration or data files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
