//! CLI argument definitions for tickerlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `resolve` | Resolve raw input to market-qualified tickers |
//! | `snapshot` | Fetch price history and fundamentals for one ticker |
//! | `news` | Aggregate recent headlines for one ticker |
//! | `report` | Write a markdown analysis report |
//! | `serve` | Run the browser dashboard |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `$TICKERLENS_CONFIG` | JSON configuration file |
//! | `--timeout-ms` | from config | Per-request timeout in ms |
//! | `--log-level` | `info` | Log filter when `RUST_LOG` is unset |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Indian names resolve to NSE
//! tickerlens resolve reliance tcs AAPL
//!
//! # Half a year of history plus fundamentals
//! tickerlens snapshot INFY --days 180 --pretty
//!
//! # Comparison report written to ./reports
//! tickerlens report TCS INFY --output reports
//!
//! # Dashboard on another port
//! tickerlens serve --addr 0.0.0.0:9000
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// 📈 tickerlens - stock dashboard and report generator
///
/// Resolves tickers across US and Indian markets, fetches prices and
/// fundamentals from Yahoo Finance, aggregates headlines and writes
/// markdown reports.
#[derive(Debug, Parser)]
#[command(
    name = "tickerlens",
    author,
    version,
    about = "Stock dashboard and report generator",
    long_about = "tickerlens fetches price history, fundamentals and news for US and Indian \
stocks. Features include:\n\
\n\
  • Ticker resolution with NSE/BSE suffixes\n\
  • Retry with backoff and listing fallback\n\
  • Headlines from Google News, Yahoo Finance and Bing News\n\
  • Deterministic markdown reports\n\
  • Browser dashboard with charts\n\
\n\
Use 'tickerlens <command> --help' for command-specific help."
)]
pub struct Cli {
    /// JSON configuration file. Falls back to $TICKERLENS_CONFIG.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in milliseconds. Overrides the configuration.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// 🔎 Resolve raw input to market-qualified tickers.
    ///
    /// Exits with code 2 when any symbol is invalid.
    ///
    /// # Examples
    ///
    ///   tickerlens resolve reliance
    ///   tickerlens resolve "TCS, INFY" AAPL
    Resolve(ResolveArgs),

    /// 📊 Fetch price history and fundamentals for one ticker.
    ///
    /// Exits with code 3 when no listing returned data.
    ///
    /// # Examples
    ///
    ///   tickerlens snapshot AAPL
    ///   tickerlens snapshot RELIANCE --days 365 --pretty
    ///   tickerlens snapshot TCS --from 2024-01-01T00:00:00Z --to 2024-06-30T00:00:00Z
    Snapshot(SnapshotArgs),

    /// 📰 Aggregate recent headlines for one ticker.
    ///
    /// Fewer headlines than requested is not an error.
    ///
    /// # Examples
    ///
    ///   tickerlens news INFY
    ///   tickerlens news AAPL --max 5
    News(NewsArgs),

    /// 📝 Write a markdown analysis report.
    ///
    /// One ticker gives a single-company report; several give a comparison.
    /// Prints the path of the written file.
    ///
    /// # Examples
    ///
    ///   tickerlens report RELIANCE
    ///   tickerlens report TCS INFY WIPRO --days 365 --output reports
    Report(ReportArgs),

    /// 🌐 Run the browser dashboard.
    ///
    /// # Examples
    ///
    ///   tickerlens serve
    ///   tickerlens serve --addr 0.0.0.0:9000
    Serve(ServeArgs),
}

/// History window shared by commands that fetch prices.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// Days of history ending now. Defaults to the configured range.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub days: Option<u32>,

    /// Range start (RFC3339 UTC). Requires --to.
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Range end (RFC3339 UTC). Requires --from.
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Symbols or company names, comma or space separated.
    #[arg(required = true)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SnapshotArgs {
    pub symbol: String,

    #[command(flatten)]
    pub range: RangeArgs,
}

#[derive(Debug, Clone, Args)]
pub struct NewsArgs {
    pub symbol: String,

    /// Maximum headlines. Defaults to the configured count.
    #[arg(long)]
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[arg(required = true)]
    pub symbols: Vec<String>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Maximum headlines per ticker.
    #[arg(long)]
    pub max_headlines: Option<usize>,

    /// Directory the report is written to.
    #[arg(long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Listen address. Overrides the configuration.
    #[arg(long, value_name = "HOST:PORT")]
    pub addr: Option<String>,
}
