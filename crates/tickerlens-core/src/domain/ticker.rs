use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::error::{SymbolIssue, ValidationError};

const MAX_SYMBOL_LEN: usize = 20;

/// Market a ticker trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Market {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "NSE")]
    Nse,
    #[serde(rename = "BSE")]
    Bse,
}

impl Market {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Nse => "NSE",
            Self::Bse => "BSE",
        }
    }

    /// Exchange suffix appended to the bare symbol, if any.
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Us => None,
            Self::Nse => Some(".NS"),
            Self::Bse => Some(".BO"),
        }
    }

    pub const fn is_indian(self) -> bool {
        matches!(self, Self::Nse | Self::Bse)
    }

    /// Currency assumed when the provider omits one.
    pub const fn default_currency(self) -> &'static str {
        match self {
            Self::Us => "USD",
            Self::Nse | Self::Bse => "INR",
        }
    }

    fn from_suffix(symbol: &str) -> Option<Self> {
        if symbol.ends_with(".NS") {
            Some(Self::Nse)
        } else if symbol.ends_with(".BO") {
            Some(Self::Bse)
        } else {
            None
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market-qualified ticker. Immutable once built; alternate listings are new values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Ticker {
    symbol: String,
    market: Market,
}

impl Ticker {
    /// Builds a ticker from a normalized symbol that already carries its suffix.
    pub(crate) fn from_qualified(symbol: String) -> Self {
        let market = Market::from_suffix(&symbol).unwrap_or(Market::Us);
        Self { symbol, market }
    }

    /// Builds a ticker for `base` listed on `market`, appending the suffix.
    pub(crate) fn listed(base: &str, market: Market) -> Self {
        let symbol = match market.suffix() {
            Some(suffix) => format!("{base}{suffix}"),
            None => base.to_owned(),
        };
        Self { symbol, market }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub const fn market(&self) -> Market {
        self.market
    }

    /// Symbol without the exchange suffix.
    pub fn base_symbol(&self) -> &str {
        self.market
            .suffix()
            .and_then(|suffix| self.symbol.strip_suffix(suffix))
            .unwrap_or(&self.symbol)
    }

    /// Same company on another market.
    pub fn on_market(&self, market: Market) -> Self {
        Self::listed(self.base_symbol(), market)
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// Trims, uppercases and validates raw ticker input.
pub(crate) fn normalize_symbol(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::invalid_symbol(input, SymbolIssue::Empty));
    }

    let normalized = trimmed.to_ascii_uppercase();
    let len = normalized.chars().count();
    if len > MAX_SYMBOL_LEN {
        return Err(ValidationError::invalid_symbol(
            input,
            SymbolIssue::TooLong {
                len,
                max: MAX_SYMBOL_LEN,
            },
        ));
    }

    for (index, ch) in normalized.chars().enumerate() {
        let allowed = ch.is_ascii_alphanumeric()
            || matches!(ch, '-' | '&')
            || (ch == '^' && index == 0)
            || (ch == '.' && index > 0 && index + 1 < len);
        if !allowed {
            return Err(ValidationError::invalid_symbol(
                input,
                SymbolIssue::InvalidChar { ch, index },
            ));
        }
    }

    Ok(normalized)
}
