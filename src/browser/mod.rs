//! Browser-automation capability consumed by the extractor.
//!
//! The extractor only talks to [`BrowserSession`]; the Chrome DevTools
//! implementation lives in [`chrome`] and is compiled with the `browser`
//! feature.

mod chrome;
mod config;
mod error;
mod scripts;

pub use chrome::{ChromeLauncher, ChromeSession};
pub use config::{BrowserEngineConfig, DESKTOP_USER_AGENT};
pub use error::{DriverError, DriverResult};

use std::time::Duration;

use async_trait::async_trait;

/// Document an element query runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentScope {
    /// The outer page.
    TopLevel,
    /// A named sub-document (iframe).
    Frame(String),
}

impl std::fmt::Display for DocumentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TopLevel => write!(f, "page"),
            Self::Frame(name) => write!(f, "frame '{}'", name),
        }
    }
}

/// Handle to the `index`-th match of `selector` within `scope`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub scope: DocumentScope,
    pub selector: String,
    pub index: usize,
}

impl ElementRef {
    pub fn new(scope: DocumentScope, selector: impl Into<String>, index: usize) -> Self {
        Self {
            scope,
            selector: selector.into(),
            index,
        }
    }
}

/// One isolated browser context with a single open page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and wait for DOM readiness, bounded by `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Wait for a navigation triggered from the page to settle.
    async fn wait_for_load(&mut self, timeout: Duration) -> DriverResult<()>;

    /// URL the page currently shows (after redirects).
    async fn current_url(&mut self) -> DriverResult<String>;

    /// Whether a sub-document with this name is attached and reachable.
    async fn has_frame(&mut self, name: &str) -> DriverResult<bool>;

    /// All elements matching `selector`, in document order.
    async fn query_all(
        &mut self,
        scope: &DocumentScope,
        selector: &str,
    ) -> DriverResult<Vec<ElementRef>>;

    /// First element matching `selector`, if any.
    async fn query_first(
        &mut self,
        scope: &DocumentScope,
        selector: &str,
    ) -> DriverResult<Option<ElementRef>> {
        Ok(self.query_all(scope, selector).await?.into_iter().next())
    }

    async fn is_visible(&mut self, element: &ElementRef) -> DriverResult<bool>;

    async fn click(&mut self, element: &ElementRef) -> DriverResult<()>;

    /// Attribute value, `None` when absent.
    async fn attribute(&mut self, element: &ElementRef, name: &str)
        -> DriverResult<Option<String>>;

    /// Press and release a named key (e.g. `"Escape"`) on the focused page.
    async fn press_key(&mut self, key: &str) -> DriverResult<()>;

    /// Tear down the context. Further calls fail with [`DriverError::Closed`].
    async fn close(&mut self) -> DriverResult<()>;
}

/// Opens a fresh [`BrowserSession`] for each extraction run.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> DriverResult<Self::Session>;
}
