//! Browser engine configuration types.
//!
//! These types live outside `#[cfg(feature = "browser")]` so that settings
//! can be built and overridden without the browser feature.

use serde::{Deserialize, Serialize};

/// Desktop Chrome user agent presented to the blog platform.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch the popup interaction while debugging.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Browser locale, sent as `--lang` and `Accept-Language`.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Viewport width in CSS pixels.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    /// Viewport height in CSS pixels.
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// User agent override applied before the first navigation.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// DevTools request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    /// Can also be set via BROWSER_URL environment variable.
    #[serde(default)]
    pub remote_url: Option<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            locale: default_locale(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `BROWSER_URL` - Remote Chrome DevTools URL
    /// - `BROWSER_HEADLESS` - `false`/`0` to show the browser window
    /// - `SOCKS_PROXY` - SOCKS proxy for browser traffic (e.g., "socks5://127.0.0.1:9050")
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("BROWSER_URL") {
            if !val.trim().is_empty() {
                self.remote_url = Some(val.trim().to_string());
            }
        }

        if let Ok(val) = std::env::var("BROWSER_HEADLESS") {
            if let Some(headless) = parse_bool(&val) {
                self.headless = headless;
            }
        }

        // Set proxy from SOCKS_PROXY if not already configured
        if self.proxy.is_none() {
            if let Ok(val) = std::env::var("SOCKS_PROXY") {
                if !val.trim().is_empty() {
                    self.proxy = Some(val.trim().to_string());
                }
            }
        }

        self
    }

    /// Value for the `Accept-Language` header derived from the locale.
    pub fn accept_language(&self) -> String {
        match self.locale.split_once('-') {
            Some((lang, _)) => format!("{},{};q=0.9", self.locale, lang),
            None => self.locale.clone(),
        }
    }
}

/// Parse common boolean spellings used in environment variables.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_locale() -> String {
    "ko-KR".to_string()
}

pub fn default_viewport_width() -> u32 {
    1280
}

pub fn default_viewport_height() -> u32 {
    720
}

pub fn default_user_agent() -> String {
    DESKTOP_USER_AGENT.to_string()
}

pub fn default_timeout() -> u64 {
    30
}
