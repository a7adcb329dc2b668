//! Application configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional JSON file (`--config` or `TICKERLENS_CONFIG`), then individual
//! environment overrides.
//!
//! ```json
//! {
//!   "addr": "0.0.0.0:8080",
//!   "timeout_ms": 8000,
//!   "retry": { "max_retries": 2, "base_delay_ms": 250, "max_delay_ms": 2000, "jitter": true },
//!   "resolver": { "symbols_file": "indian_symbols.json", "long_symbol_threshold": null }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::news::DEFAULT_MAX_HEADLINES;
use crate::resolver::DEFAULT_LONG_SYMBOL_THRESHOLD;
use crate::retry::{Backoff, RetryConfig};
use crate::{TickerResolver, DEFAULT_RANGE_DAYS};

pub const CONFIG_ENV: &str = "TICKERLENS_CONFIG";
pub const ADDR_ENV: &str = "TICKERLENS_ADDR";
pub const TIMEOUT_ENV: &str = "TICKERLENS_TIMEOUT_MS";
pub const INDIAN_SYMBOLS_ENV: &str = "TICKERLENS_INDIAN_SYMBOLS";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1_800;
pub const DEFAULT_NEWS_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_LISTING_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSettings {
    /// JSON array of bare NSE symbols replacing the built-in list.
    pub symbols_file: Option<PathBuf>,
    /// `null` disables the long-symbol heuristic.
    pub long_symbol_threshold: Option<usize>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            symbols_file: None,
            long_symbol_threshold: Some(DEFAULT_LONG_SYMBOL_THRESHOLD),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Dashboard listen address.
    pub addr: String,
    /// Per outbound HTTP call.
    pub timeout_ms: u64,
    pub retry: RetrySettings,
    pub cache_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub range_days: u32,
    pub max_headlines: usize,
    /// Minimum spacing between news source calls.
    pub news_interval_ms: u64,
    /// Minimum spacing between market-data listing lookups.
    pub listing_interval_ms: u64,
    pub resolver: ResolverSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetrySettings::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            range_days: DEFAULT_RANGE_DAYS,
            max_headlines: DEFAULT_MAX_HEADLINES,
            news_interval_ms: DEFAULT_NEWS_INTERVAL_MS,
            listing_interval_ms: DEFAULT_LISTING_INTERVAL_MS,
            resolver: ResolverSettings::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `path` (or `TICKERLENS_CONFIG`), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        config.validate()
    }

    /// Applies `TICKERLENS_*` overrides looked up through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ADDR_ENV).filter(|value| !value.trim().is_empty()) {
            self.addr = addr.trim().to_owned();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: TIMEOUT_ENV,
                value: raw.clone(),
            })?;
        }
        if let Some(path) = lookup(INDIAN_SYMBOLS_ENV).filter(|value| !value.trim().is_empty()) {
            self.resolver.symbols_file = Some(PathBuf::from(path.trim()));
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                value: self.timeout_ms.to_string(),
            });
        }
        if self.range_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "range_days",
                value: self.range_days.to_string(),
            });
        }
        if self.max_headlines == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_headlines",
                value: self.max_headlines.to_string(),
            });
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay_ms",
                value: self.retry.base_delay_ms.to_string(),
            });
        }
        Ok(self)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(self.retry.base_delay_ms),
                factor: 2.0,
                max: Duration::from_millis(self.retry.max_delay_ms),
                jitter: self.retry.jitter,
            },
            ..RetryConfig::default()
        }
    }

    /// Resolver from the configured symbol list, or the built-in one.
    pub fn resolver(&self) -> Result<TickerResolver, ConfigError> {
        let resolver = match &self.resolver.symbols_file {
            Some(path) => TickerResolver::from_symbol_file(path)?,
            None => TickerResolver::default(),
        };
        Ok(resolver.with_long_symbol_threshold(self.resolver.long_symbol_threshold))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn news_interval(&self) -> Duration {
        Duration::from_millis(self.news_interval_ms)
    }

    pub fn listing_interval(&self) -> Duration {
        Duration::from_millis(self.listing_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::Market;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_temp(r#"{ "timeout_ms": 2500, "retry": { "max_retries": 1 } }"#);

        let config = AppConfig::from_file(file.path()).expect("valid config");

        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.retry_config().max_attempts(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let file = write_temp(r#"{ "timeout": 10 }"#);

        let err = AppConfig::from_file(file.path()).expect_err("must fail");

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AppConfig::from_file("/definitely/not/here.json").expect_err("must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn environment_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ADDR_ENV, "0.0.0.0:9000"),
            (TIMEOUT_ENV, " 1500 "),
            (INDIAN_SYMBOLS_ENV, "/etc/tickerlens/symbols.json"),
        ]);

        let config = AppConfig::default()
            .with_overrides(|key| env.get(key).map(|value| (*value).to_owned()))
            .expect("valid overrides");

        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(
            config.resolver.symbols_file.as_deref(),
            Some(Path::new("/etc/tickerlens/symbols.json"))
        );
    }

    #[test]
    fn bad_timeout_override_is_rejected() {
        let err = AppConfig::default()
            .with_overrides(|key| (key == TIMEOUT_ENV).then(|| "soon".to_owned()))
            .expect_err("must fail");

        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: TIMEOUT_ENV, .. }
        ));
    }

    #[test]
    fn resolver_uses_symbol_file_and_threshold() {
        let symbols = write_temp(r#"["ZOMATO"]"#);
        let mut config = AppConfig::default();
        config.resolver.symbols_file = Some(symbols.path().to_path_buf());
        config.resolver.long_symbol_threshold = None;

        let resolver = config.resolver().expect("valid list");

        assert_eq!(resolver.resolve("zomato").expect("valid").market(), Market::Nse);
        assert_eq!(resolver.resolve("RELIANCE").expect("valid").market(), Market::Us);
    }
}
