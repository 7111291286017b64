//! Runtime settings assembled from defaults and environment variables.
//!
//! There is no configuration file. `.env` is loaded by `main` before this
//! module reads anything.

use tracing::warn;

use crate::browser::BrowserEngineConfig;
use crate::http_client::RetryConfig;
use crate::services::{DownloadConfig, ExtractorConfig};

/// Worker pool width override.
pub const ENV_CONCURRENCY: &str = "NAVERDL_CONCURRENCY";
/// User agent for image requests (`browser`, `impersonate`, or a literal value).
pub const ENV_USER_AGENT: &str = "NAVERDL_USER_AGENT";
/// Extra attempts per image fetch.
pub const ENV_RETRIES: &str = "NAVERDL_RETRIES";

/// Settings for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub browser: BrowserEngineConfig,
    pub extractor: ExtractorConfig,
    pub download: DownloadConfig,
}

impl Settings {
    /// Defaults with process environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self {
            browser: BrowserEngineConfig::default().with_env_overrides(),
            ..Self::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Apply the `NAVERDL_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workers) = lookup(ENV_CONCURRENCY).and_then(|v| parse_env(ENV_CONCURRENCY, &v)) {
            if workers > 0 {
                self.download.concurrency = workers;
            } else {
                warn!("Ignoring {}=0, keeping {}", ENV_CONCURRENCY, self.download.concurrency);
            }
        }

        if let Some(ua) = lookup(ENV_USER_AGENT) {
            let ua = ua.trim();
            if !ua.is_empty() {
                self.download.user_agent = Some(ua.to_string());
            }
        }

        if let Some(retries) = lookup(ENV_RETRIES).and_then(|v| parse_env::<u32>(ENV_RETRIES, &v)) {
            self.download.retry = RetryConfig::default().with_max_retries(retries);
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", key, value);
            None
        }
    }
}
