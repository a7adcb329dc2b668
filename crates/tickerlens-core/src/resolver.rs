//! Ticker resolution: raw user input to a market-qualified [`Ticker`].
//!
//! | Input | Result |
//! |-------|--------|
//! | `"reliance"` | `RELIANCE.NS` on NSE (listed Indian symbol) |
//! | `"TCS.BO"` | `TCS.BO` on BSE (suffix kept) |
//! | `"BRK.B"` | `BRK.B` on US (foreign dot, unchanged) |
//! | `"AAPL"` | `AAPL` on US |
//! | `""` | `ValidationError::InvalidSymbol` |

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::domain::normalize_symbol;
use crate::error::{ConfigError, ValidationError};
use crate::{Market, Ticker};

/// Bare symbols longer than this are assumed to be NSE listings.
pub const DEFAULT_LONG_SYMBOL_THRESHOLD: usize = 6;

/// Curated NSE symbols recognized without a suffix.
pub const DEFAULT_INDIAN_SYMBOLS: &[&str] = &[
    "RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK", "SBIN", "ITC", "HINDUNILVR",
    "BHARTIARTL", "KOTAKBANK", "LT", "ASIANPAINT", "MARUTI", "TITAN", "NESTLEIND",
    "ULTRACEMCO", "POWERGRID", "NTPC", "ONGC", "COALINDIA", "WIPRO", "TECHM", "HCLTECH",
    "DRREDDY", "SUNPHARMA", "CIPLA", "DIVISLAB", "BAJFINANCE", "BAJAJFINSV", "AXISBANK",
    "INDUSINDBK", "TATAMOTORS", "TATASTEEL", "JSWSTEEL", "HINDALCO", "ADANIPORTS", "ADANIENT",
    "GRASIM", "BRITANNIA", "HEROMOTOCO", "BAJAJ-AUTO", "EICHERMOT", "BPCL", "IOC", "SHREECEM",
    "AMBUJACEM", "ACC", "VEDL", "SAIL", "NMDC", "JINDALSTEL", "TATACHEM", "UPL", "PIDILITIND",
    "DMART", "GODREJCP", "MARICO", "DABUR", "COLPAL", "PGHH", "MCDOWELL-N", "UBL", "APOLLOHOSP",
    "FORTIS", "LUPIN", "BIOCON", "CADILAHC", "AUROPHARMA", "TORNTPHARM", "ALKEM", "CONCOR",
    "SIEMENS", "ABB", "BHEL", "CROMPTON", "HAVELLS", "VOLTAS", "BLUESTAR", "CUMMINSIND",
    "BOSCHLTD", "MOTHERSUMI", "AMARAJABAT", "EXIDEIND", "MFSL", "SRTRANSFIN", "CHOLAFIN", "PFC",
    "RECLTD", "IRCTC", "FINOPB", "INOXGREEN", "M&M",
];

/// Pure resolver from raw input to [`Ticker`].
#[derive(Debug, Clone)]
pub struct TickerResolver {
    indian_symbols: HashSet<String>,
    long_symbol_threshold: Option<usize>,
}

impl Default for TickerResolver {
    fn default() -> Self {
        Self::new(DEFAULT_INDIAN_SYMBOLS.iter().copied())
    }
}

impl TickerResolver {
    /// Resolver backed by `symbols`, with the long-symbol heuristic enabled.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            indian_symbols: symbols
                .into_iter()
                .map(|symbol| symbol.as_ref().trim().to_ascii_uppercase())
                .filter(|symbol| !symbol.is_empty())
                .collect(),
            long_symbol_threshold: Some(DEFAULT_LONG_SYMBOL_THRESHOLD),
        }
    }

    /// Loads the Indian symbol list from a JSON array of strings.
    pub fn from_symbol_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let symbols: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), count = symbols.len(), "loaded indian symbol list");
        Ok(Self::new(symbols))
    }

    /// `None` disables the heuristic so only listed symbols get a suffix.
    pub fn with_long_symbol_threshold(mut self, threshold: Option<usize>) -> Self {
        self.long_symbol_threshold = threshold;
        self
    }

    pub fn is_listed_indian(&self, base_symbol: &str) -> bool {
        self.indian_symbols.contains(base_symbol)
    }

    pub fn resolve(&self, raw: &str) -> Result<Ticker, ValidationError> {
        let symbol = normalize_symbol(raw)?;

        let ticker = if symbol.contains('.') || symbol.starts_with('^') {
            Ticker::from_qualified(symbol)
        } else if self.looks_indian(&symbol) {
            Ticker::listed(&symbol, Market::Nse)
        } else {
            Ticker::listed(&symbol, Market::Us)
        };

        debug!(input = raw, ticker = %ticker, market = %ticker.market(), "resolved ticker");
        Ok(ticker)
    }

    /// Resolves a comma or whitespace separated list, keeping first-seen order.
    pub fn resolve_many(&self, raw: &str) -> Result<Vec<Ticker>, ValidationError> {
        let mut tickers: Vec<Ticker> = Vec::new();
        for part in raw
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|part| !part.is_empty())
        {
            let ticker = self.resolve(part)?;
            if !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }

        if tickers.is_empty() {
            return self.resolve(raw).map(|ticker| vec![ticker]);
        }
        Ok(tickers)
    }

    fn looks_indian(&self, symbol: &str) -> bool {
        self.is_listed_indian(symbol)
            || self
                .long_symbol_threshold
                .is_some_and(|threshold| symbol.len() > threshold)
    }
}
