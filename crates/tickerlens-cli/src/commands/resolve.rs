use serde::Serialize;
use serde_json::Value;
use tickerlens_core::{AnalysisSession, Ticker};

use crate::cli::ResolveArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ResolveResponseData {
    tickers: Vec<Ticker>,
}

pub fn run(args: &ResolveArgs, session: &AnalysisSession) -> Result<Value, CliError> {
    let tickers = session.resolve(&args.symbols.join(","))?;
    Ok(serde_json::to_value(ResolveResponseData { tickers })?)
}
