use std::path::PathBuf;

use tickerlens_core::news::validate_headline_count;
use tickerlens_core::{AnalysisSession, UtcDateTime};
use tracing::info;

use crate::cli::ReportArgs;
use crate::error::CliError;

use super::date_range;

/// Writes the report into `--output` and prints its path.
pub async fn run(args: &ReportArgs, session: &AnalysisSession) -> Result<PathBuf, CliError> {
    let range = date_range(&args.range, session)?;
    let max = validate_headline_count(args.max_headlines.unwrap_or(session.max_headlines()))?;

    let report = session
        .report(&args.symbols.join(","), range, max, UtcDateTime::now())
        .await?;

    std::fs::create_dir_all(&args.output)?;
    let path = args.output.join(&report.filename);
    std::fs::write(&path, report.markdown.as_bytes())?;

    info!(path = %path.display(), "report written");
    println!("{}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tickerlens_core::{AppConfig, ScriptedHttpClient};

    use super::*;
    use crate::cli::RangeArgs;

    #[tokio::test]
    async fn report_is_written_even_without_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.retry.max_retries = 0;
        config.news_interval_ms = 1;
        config.listing_interval_ms = 1;
        let session = AnalysisSession::with_http(&config, Arc::new(ScriptedHttpClient::new()))
            .expect("default config");
        let args = ReportArgs {
            symbols: vec!["infy".into()],
            range: RangeArgs {
                days: Some(30),
                from: None,
                to: None,
            },
            max_headlines: Some(3),
            output: dir.path().join("reports"),
        };

        let path = run(&args, &session).await.expect("report written");

        let name = path.file_name().and_then(|name| name.to_str()).expect("file name");
        assert!(name.starts_with("INFY.NS_report_"));
        let markdown = std::fs::read_to_string(&path).expect("readable");
        assert!(markdown.contains("_Data not available._"));
    }
}
