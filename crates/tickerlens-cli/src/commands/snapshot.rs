use serde_json::Value;
use tickerlens_core::AnalysisSession;

use crate::cli::SnapshotArgs;
use crate::error::CliError;

use super::date_range;

pub async fn run(args: &SnapshotArgs, session: &AnalysisSession) -> Result<Value, CliError> {
    let ticker = session.resolver().resolve(&args.symbol)?;
    let range = date_range(&args.range, session)?;

    let snapshot = session.snapshot(&ticker, range).await?;
    Ok(serde_json::to_value(snapshot)?)
}
