//! Which `User-Agent` image requests present to the blog CDN.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::browser::DESKTOP_USER_AGENT;

pub const USER_AGENT: &str = concat!("naverdl/", env!("CARGO_PKG_VERSION"));

/// Desktop browser identities cycled through by [`UserAgentPolicy::Rotate`].
pub const ROTATION_POOL: &[&str] = &[
    DESKTOP_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

static NEXT_IN_POOL: AtomicUsize = AtomicUsize::new(0);

/// User agent selection, parsed from `NAVERDL_USER_AGENT`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserAgentPolicy {
    /// Identify as this tool.
    #[default]
    Crate,
    /// Same identity the browser session used to discover the URLs.
    Browser,
    /// Next entry of [`ROTATION_POOL`] for each client built.
    Rotate,
    /// Verbatim header value.
    Custom(String),
}

impl UserAgentPolicy {
    /// `browser` and `impersonate` are keywords (case-insensitive); any
    /// other non-blank value is sent as given.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Crate;
        };
        match value.to_ascii_lowercase().as_str() {
            "browser" => Self::Browser,
            "impersonate" => Self::Rotate,
            _ => Self::Custom(value.to_string()),
        }
    }

    /// Header value for a newly built client.
    pub fn header_value(&self) -> String {
        match self {
            Self::Crate => USER_AGENT.to_string(),
            Self::Browser => DESKTOP_USER_AGENT.to_string(),
            Self::Rotate => {
                let slot = NEXT_IN_POOL.fetch_add(1, Ordering::Relaxed) % ROTATION_POOL.len();
                ROTATION_POOL[slot].to_string()
            }
            Self::Custom(value) => value.clone(),
        }
    }
}
