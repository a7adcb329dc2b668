use serde_json::Value;
use tickerlens_core::news::validate_headline_count;
use tickerlens_core::AnalysisSession;
use tracing::info;

use crate::cli::NewsArgs;
use crate::error::CliError;

/// Headlines are searched by company name, so the snapshot is fetched first.
/// A missing snapshot falls back to a symbol-only query.
pub async fn run(args: &NewsArgs, session: &AnalysisSession) -> Result<Value, CliError> {
    let ticker = session.resolver().resolve(&args.symbol)?;
    let max = validate_headline_count(args.max.unwrap_or(session.max_headlines()))?;
    let range = session.default_range()?;

    let input = session.analyze_ticker(&ticker, range, max).await;
    if input.news.is_partial() {
        info!(
            ticker = %ticker,
            found = input.news.items.len(),
            requested = max,
            "fewer headlines than requested"
        );
    }
    Ok(serde_json::to_value(input.news)?)
}
