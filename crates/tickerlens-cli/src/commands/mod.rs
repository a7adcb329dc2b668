mod news;
mod report;
mod resolve;
mod serve;
mod snapshot;

use serde_json::Value;
use tickerlens_core::{AnalysisSession, AppConfig, ConfigError, DateRange, UtcDateTime, ValidationError};

use crate::cli::{Cli, Command, RangeArgs};
use crate::error::CliError;

/// Configuration file (or `$TICKERLENS_CONFIG`), environment, then CLI flags.
pub fn load_config(cli: &Cli) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(timeout_ms) = cli.timeout_ms {
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                value: timeout_ms.to_string(),
            }
            .into());
        }
        config.timeout_ms = timeout_ms;
    }
    Ok(config)
}

/// Runs the selected command. `None` means the command printed its own output.
pub async fn run(cli: &Cli, config: AppConfig) -> Result<Option<Value>, CliError> {
    match &cli.command {
        Command::Resolve(args) => resolve::run(args, &session(&config)?).map(Some),
        Command::Snapshot(args) => snapshot::run(args, &session(&config)?).await.map(Some),
        Command::News(args) => news::run(args, &session(&config)?).await.map(Some),
        Command::Report(args) => report::run(args, &session(&config)?).await.map(|_| None),
        Command::Serve(args) => serve::run(args, config).await.map(|()| None),
    }
}

fn session(config: &AppConfig) -> Result<AnalysisSession, CliError> {
    Ok(AnalysisSession::new(config)?)
}

/// Explicit `--from/--to`, else `--days`, else the session default.
fn date_range(args: &RangeArgs, session: &AnalysisSession) -> Result<DateRange, ValidationError> {
    match (&args.from, &args.to, args.days) {
        (Some(from), Some(to), _) => DateRange::new(UtcDateTime::parse(from)?, UtcDateTime::parse(to)?),
        (_, _, Some(days)) => DateRange::last_days(days),
        _ => session.default_range(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AnalysisSession {
        AnalysisSession::new(&AppConfig::default()).expect("default config")
    }

    #[test]
    fn explicit_range_wins() {
        let args = RangeArgs {
            days: None,
            from: Some("2024-01-01T00:00:00Z".into()),
            to: Some("2024-06-30T00:00:00Z".into()),
        };

        let range = date_range(&args, &session()).expect("valid range");

        assert_eq!(range.start().format_date(), "2024-01-01");
        assert_eq!(range.end().format_date(), "2024-06-30");
    }

    #[test]
    fn reversed_range_is_rejected() {
        let args = RangeArgs {
            days: None,
            from: Some("2024-06-30T00:00:00Z".into()),
            to: Some("2024-01-01T00:00:00Z".into()),
        };

        let err = date_range(&args, &session()).expect_err("reversed");

        assert!(matches!(err, ValidationError::InvalidDateRange { .. }));
    }

    #[test]
    fn zero_days_is_rejected() {
        let args = RangeArgs {
            days: Some(0),
            from: None,
            to: None,
        };

        assert!(date_range(&args, &session()).is_err());
    }
}
