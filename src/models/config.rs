//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Adapter definition location
    #[serde(default)]
    pub adapters: AdapterConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent", "is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs", "must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::config("crawler.max_concurrent", "must be > 0"));
        }
        if self.crawler.per_site_concurrency == 0 {
            return Err(AppError::config(
                "crawler.per_site_concurrency",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header used when an adapter declares none
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-fetch deadline in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Stage invocations run concurrently by the worker pool
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// In-flight fetches allowed against a single site
    #[serde(default = "defaults::per_site_concurrency")]
    pub per_site_concurrency: usize,

    /// Retries after a transient fetch failure
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry, doubled on every further attempt
    #[serde(default = "defaults::retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Delay before each fetch in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            per_site_concurrency: defaults::per_site_concurrency(),
            max_retries: defaults::max_retries(),
            retry_base_delay_ms: defaults::retry_base_delay(),
            request_delay_ms: 0,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Where adapter definitions are loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default = "defaults::adapter_dir")]
    pub dir: PathBuf,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            dir: defaults::adapter_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn max_concurrent() -> usize {
        8
    }
    pub fn per_site_concurrency() -> usize {
        2
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_base_delay() -> u64 {
        500
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }

    // Adapter defaults
    pub fn adapter_dir() -> PathBuf {
        PathBuf::from("adapters")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.adapters.dir, PathBuf::from("adapters"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            timeout_secs = 5
            max_retries = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.timeout_secs, 5);
        assert_eq!(config.crawler.max_retries, 4);
        assert_eq!(config.crawler.per_site_concurrency, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.crawler.per_site_concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::Config { ref field, .. }) if field == "crawler.per_site_concurrency"
        ));

        let mut config = Config::default();
        config.crawler.user_agent = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_delay_doubles() {
        let crawler = CrawlerConfig {
            retry_base_delay_ms: 100,
            ..CrawlerConfig::default()
        };
        assert_eq!(crawler.retry_delay(1), Duration::from_millis(100));
        assert_eq!(crawler.retry_delay(2), Duration::from_millis(200));
        assert_eq!(crawler.retry_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.crawler.timeout_secs, 15);

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[adapters]\ndir = \"sites\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.adapters.dir, PathBuf::from("sites"));
    }
}
