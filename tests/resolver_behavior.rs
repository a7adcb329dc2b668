//! Behavior-driven tests for ticker resolution
//!
//! These tests verify HOW raw user input becomes a market-qualified ticker,
//! and that bad input is rejected before any network call is made.

use std::io::Write;

use tickerlens_core::resolver::DEFAULT_INDIAN_SYMBOLS;
use tickerlens_core::{Market, SymbolIssue, TickerResolver, ValidationError};

// =============================================================================
// Resolution: Indian listings
// =============================================================================

#[test]
fn when_user_types_a_known_indian_name_system_adds_the_nse_suffix() {
    // Given: The default resolver
    let resolver = TickerResolver::default();

    // When: A lowercase NSE symbol is entered
    let ticker = resolver.resolve("  reliance ").expect("valid symbol");

    // Then: It is qualified for NSE
    assert_eq!(ticker.symbol(), "RELIANCE.NS");
    assert_eq!(ticker.market(), Market::Nse);
    assert_eq!(ticker.base_symbol(), "RELIANCE");
}

#[test]
fn when_any_listed_indian_symbol_is_entered_system_qualifies_it_for_nse() {
    // Given: The default resolver and its built-in Indian list
    let resolver = TickerResolver::default();

    for &symbol in DEFAULT_INDIAN_SYMBOLS {
        // When: The bare symbol is entered in lowercase
        let ticker = resolver
            .resolve(&symbol.to_lowercase())
            .unwrap_or_else(|err| panic!("{symbol} should resolve: {err}"));

        // Then: It is an NSE listing of the same company
        assert_eq!(ticker.market(), Market::Nse, "{symbol}");
        assert_eq!(ticker.symbol(), format!("{symbol}.NS"));
        assert_eq!(ticker.base_symbol(), symbol);
    }
}

#[test]
fn when_a_resolved_ticker_is_resolved_again_system_returns_it_unchanged() {
    let resolver = TickerResolver::default();
    let inputs = DEFAULT_INDIAN_SYMBOLS
        .iter()
        .copied()
        .chain(["AAPL", "brk.b", "tcs.bo", "INFY.NS", "ZOMATOLTD", "msft"]);

    for input in inputs {
        let ticker = resolver.resolve(input).expect("valid symbol");

        let again = resolver.resolve(ticker.symbol()).expect("resolved symbols stay valid");

        assert_eq!(again, ticker, "{input}");
    }
}

#[test]
fn when_user_types_an_explicit_exchange_suffix_system_keeps_it() {
    let resolver = TickerResolver::default();

    let bse = resolver.resolve("tcs.bo").expect("valid symbol");
    let nse = resolver.resolve("INFY.NS").expect("valid symbol");

    assert_eq!(bse.symbol(), "TCS.BO");
    assert_eq!(bse.market(), Market::Bse);
    assert_eq!(nse.symbol(), "INFY.NS");
}

#[test]
fn when_long_unknown_symbol_is_entered_system_assumes_nse() {
    // Given: A resolver that knows no Indian symbols
    let resolver = TickerResolver::new(Vec::<String>::new());

    // When: A symbol longer than six characters is entered
    let ticker = resolver.resolve("ZOMATOLTD").expect("valid symbol");

    // Then: The length heuristic puts it on NSE
    assert_eq!(ticker.symbol(), "ZOMATOLTD.NS");
}

#[test]
fn when_length_heuristic_is_disabled_system_only_suffixes_listed_symbols() {
    let resolver = TickerResolver::new(["TCS"]).with_long_symbol_threshold(None);

    assert_eq!(resolver.resolve("ZOMATOLTD").expect("valid").symbol(), "ZOMATOLTD");
    assert_eq!(resolver.resolve("tcs").expect("valid").symbol(), "TCS.NS");
}

#[test]
fn when_symbol_list_file_is_supplied_system_uses_it() {
    // Given: A JSON symbol list on disk
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"["PAYTM", "nykaa"]"#).expect("write list");

    // When: The resolver is loaded from it
    let resolver = TickerResolver::from_symbol_file(file.path())
        .expect("valid list")
        .with_long_symbol_threshold(None);

    // Then: Listed names resolve to NSE, others stay US
    assert_eq!(resolver.resolve("paytm").expect("valid").symbol(), "PAYTM.NS");
    assert_eq!(resolver.resolve("NYKAA").expect("valid").symbol(), "NYKAA.NS");
    assert_eq!(resolver.resolve("RELIANCE").expect("valid").symbol(), "RELIANCE");
}

// =============================================================================
// Resolution: US and foreign symbols
// =============================================================================

#[test]
fn when_user_types_a_us_symbol_system_leaves_it_unsuffixed() {
    let resolver = TickerResolver::default();

    let ticker = resolver.resolve("aapl").expect("valid symbol");

    assert_eq!(ticker.symbol(), "AAPL");
    assert_eq!(ticker.market(), Market::Us);
}

#[test]
fn when_symbol_carries_a_foreign_dot_system_passes_it_through() {
    let resolver = TickerResolver::default();

    let ticker = resolver.resolve("BRK.B").expect("valid symbol");

    assert_eq!(ticker.symbol(), "BRK.B");
    assert_eq!(ticker.market(), Market::Us);
}

#[test]
fn when_resolving_a_list_system_keeps_first_seen_order_without_duplicates() {
    let resolver = TickerResolver::default();

    let tickers = resolver
        .resolve_many("tcs, AAPL  infy,TCS")
        .expect("valid symbols");

    let symbols: Vec<&str> = tickers.iter().map(|ticker| ticker.symbol()).collect();
    assert_eq!(symbols, ["TCS.NS", "AAPL", "INFY.NS"]);
}

// =============================================================================
// Resolution: invalid input
// =============================================================================

#[test]
fn when_input_is_blank_system_returns_invalid_symbol() {
    let resolver = TickerResolver::default();

    let error = resolver.resolve("   ").expect_err("blank must fail");

    assert!(matches!(
        error,
        ValidationError::InvalidSymbol {
            issue: SymbolIssue::Empty,
            ..
        }
    ));
}

#[test]
fn when_input_contains_punctuation_system_names_the_offending_character() {
    let resolver = TickerResolver::default();

    let error = resolver.resolve("AA$PL").expect_err("must fail");

    assert!(matches!(
        error,
        ValidationError::InvalidSymbol {
            issue: SymbolIssue::InvalidChar { ch: '$', index: 2 },
            ..
        }
    ));
    assert!(error.to_string().contains("'$'"));
}

#[test]
fn when_one_symbol_in_a_list_is_invalid_system_rejects_the_whole_list() {
    let resolver = TickerResolver::default();

    let result = resolver.resolve_many("TCS, INFY, @@");

    assert!(matches!(result, Err(ValidationError::InvalidSymbol { .. })));
}

#[test]
fn when_input_is_too_long_system_rejects_it() {
    let resolver = TickerResolver::default();

    let error = resolver
        .resolve("ABCDEFGHIJKLMNOPQRSTUVWXYZ")
        .expect_err("must fail");

    assert!(matches!(
        error,
        ValidationError::InvalidSymbol {
            issue: SymbolIssue::TooLong { len: 26, max: 20 },
            ..
        }
    ));
}
