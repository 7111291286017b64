//! Image reference extraction.
//!
//! Drives one browser session through the blog's post page: mobile-to-desktop
//! redirect, the post content frame, then a click on every thumbnail to open
//! the original-size viewer and read its image source. Every failure is
//! folded into the returned [`FetchResult`].

mod config;
pub mod ordering;

pub use config::{ExtractorConfig, PlatformSelectors};

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::{
    BrowserSession, DocumentScope, DriverError, DriverResult, ElementRef, SessionLauncher,
};
use crate::models::FetchResult;

/// Informational entry for a post without embedded images.
pub const NO_IMAGES_FOUND: &str = "no images found";

/// Why one thumbnail yielded no URL.
#[derive(Debug, Error)]
enum ThumbnailError {
    #[error("original image not found in preview popup")]
    OverlayMissing,

    #[error("invalid image link: {0}")]
    InvalidSource(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Where a session ended up before the result is assembled.
enum Walk {
    /// Thumbnails never appeared, or the session died while waiting.
    NotReady(String),
    NoThumbnails,
    Collected {
        total: usize,
        urls: Vec<String>,
        errors: Vec<String>,
    },
}

/// True for absolute `http`/`https` URLs.
fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Message for a failed thumbnail readiness wait.
fn readiness_message(err: &DriverError) -> String {
    if err.is_timeout() {
        "timed out waiting for image elements".to_string()
    } else if err.is_closed() {
        format!("browser/page was closed: {}", err)
    } else {
        format!("error while loading images: {}", err)
    }
}

/// Extracts ordered original-resolution image URLs from a blog post.
pub struct ImageExtractor<L> {
    launcher: L,
    config: ExtractorConfig,
}

impl<L: SessionLauncher> ImageExtractor<L> {
    pub fn new(launcher: L) -> Self {
        Self::with_config(launcher, ExtractorConfig::default())
    }

    pub fn with_config(launcher: L, config: ExtractorConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run the full extraction protocol against `page_url`.
    pub async fn extract(&self, page_url: &str) -> FetchResult {
        let started = Instant::now();
        info!("Extracting images from {}", page_url);

        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Browser launch failed: {}", e);
                return FetchResult::aborted(e.to_string(), started.elapsed());
            }
        };

        let walk = self.run(&mut session, page_url).await;

        if let Err(e) = session.close().await {
            debug!("Ignoring error while closing browser: {}", e);
        }

        match walk {
            Err(e) => {
                warn!("Extraction aborted: {}", e);
                FetchResult::aborted(e.to_string(), started.elapsed())
            }
            Ok(Walk::NotReady(message)) => {
                warn!("{}", message);
                FetchResult::readiness_failed(message, started.elapsed())
            }
            Ok(Walk::NoThumbnails) => {
                info!("No images found on {}", page_url);
                FetchResult::empty(NO_IMAGES_FOUND, started.elapsed())
            }
            Ok(Walk::Collected {
                total,
                urls,
                errors,
            }) => {
                let urls = ordering::correct_order(urls);
                info!(
                    "Resolved {}/{} image URLs ({} errors)",
                    urls.len(),
                    total,
                    errors.len()
                );
                FetchResult::completed(total, urls, errors, started.elapsed())
            }
        }
    }

    /// Steps 2-7 of the protocol. `Err` means the run could not start at all.
    async fn run<S: BrowserSession>(&self, session: &mut S, page_url: &str) -> DriverResult<Walk> {
        let selectors = &self.config.selectors;

        session
            .navigate(page_url, self.config.navigation_timeout)
            .await?;
        tokio::time::sleep(self.config.settle_delay).await;

        self.switch_to_desktop(session).await;

        let scope = self.resolve_scope(session).await;
        debug!("Using {} as content root", scope);

        debug!("Waiting for image elements...");
        if let Err(e) = self
            .wait_for_selector(
                session,
                &scope,
                &selectors.thumbnail,
                self.config.thumbnail_timeout,
            )
            .await
        {
            return Ok(Walk::NotReady(readiness_message(&e)));
        }

        // Late images keep attaching for a moment after the first one appears
        tokio::time::sleep(self.config.settle_delay).await;

        let thumbnails = session.query_all(&scope, &selectors.thumbnail).await?;
        debug!("Found {} images", thumbnails.len());

        if thumbnails.is_empty() {
            return Ok(Walk::NoThumbnails);
        }

        let (urls, errors) = self.collect(session, &scope, &thumbnails).await;

        Ok(Walk::Collected {
            total: thumbnails.len(),
            urls,
            errors,
        })
    }

    /// Follow the mobile site's "PC version" link. Best-effort.
    async fn switch_to_desktop<S: BrowserSession>(&self, session: &mut S) {
        let current = match session.current_url().await {
            Ok(url) => url,
            Err(e) => {
                debug!("Could not read current URL: {}", e);
                return;
            }
        };

        if !current.contains(&self.config.selectors.mobile_marker) {
            return;
        }

        info!("Mobile layout detected, switching to desktop version");
        if let Err(e) = self.try_switch_to_desktop(session).await {
            warn!("Error while switching to desktop version: {}", e);
        }
    }

    async fn try_switch_to_desktop<S: BrowserSession>(&self, session: &mut S) -> DriverResult<()> {
        let control = session
            .query_first(&DocumentScope::TopLevel, &self.config.selectors.desktop_switch)
            .await?;

        let Some(control) = control else {
            debug!("No desktop switch control on page");
            return Ok(());
        };

        if !session.is_visible(&control).await? {
            debug!("Desktop switch control is hidden");
            return Ok(());
        }

        session.click(&control).await?;
        session
            .wait_for_load(self.config.desktop_switch_timeout)
            .await?;
        tokio::time::sleep(self.config.settle_delay).await;
        Ok(())
    }

    /// Pick the post content frame if it shows up in time, else the page itself.
    async fn resolve_scope<S: BrowserSession>(&self, session: &mut S) -> DocumentScope {
        let name = &self.config.selectors.content_frame;
        let deadline = Instant::now() + self.config.frame_timeout;

        loop {
            match session.has_frame(name).await {
                Ok(true) => return DocumentScope::Frame(name.clone()),
                Ok(false) => {}
                Err(e) => {
                    debug!("Frame lookup failed, using top-level document: {}", e);
                    return DocumentScope::TopLevel;
                }
            }

            if Instant::now() >= deadline {
                return DocumentScope::TopLevel;
            }
            tokio::time::sleep(self.config.wait_poll_interval).await;
        }
    }

    /// Poll until `selector` matches at least one element or `timeout` passes.
    async fn wait_for_selector<S: BrowserSession>(
        &self,
        session: &mut S,
        scope: &DocumentScope,
        selector: &str,
        timeout: std::time::Duration,
    ) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;

        loop {
            if !session.query_all(scope, selector).await?.is_empty() {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!(
                    "waiting for '{}' exceeded {}ms",
                    selector,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.config.wait_poll_interval).await;
        }
    }

    /// Resolve every thumbnail in DOM order.
    async fn collect<S: BrowserSession>(
        &self,
        session: &mut S,
        scope: &DocumentScope,
        thumbnails: &[ElementRef],
    ) -> (Vec<String>, Vec<String>) {
        let total = thumbnails.len();
        let mut urls = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for (idx, thumbnail) in thumbnails.iter().enumerate() {
            let position = idx + 1;
            debug!("Processing image {}/{}", position, total);

            let outcome = match session.is_visible(thumbnail).await {
                Ok(true) => self.resolve_in_overlay(session, scope, thumbnail).await,
                Ok(false) => {
                    errors.push(format!("image {} is not visible", position));
                    continue;
                }
                Err(e) => Err(ThumbnailError::Driver(e)),
            };

            match outcome {
                Ok(url) => {
                    debug!("Image {} URL: {}", position, url);
                    urls.push(url);
                }
                Err(ThumbnailError::Driver(e)) if e.is_closed() => {
                    warn!("Browser closed at image {}: {}", position, e);
                    errors.push(format!(
                        "image {}: browser was closed while processing",
                        position
                    ));
                    break;
                }
                Err(e) => {
                    debug!("Image {} failed: {}", position, e);
                    errors.push(format!("image {}: {}", position, e));
                }
            }
        }

        (urls, errors)
    }

    /// Open the viewer for `thumbnail` and read its source.
    ///
    /// The viewer is dismissed on every path out of here, including errors.
    async fn resolve_in_overlay<S: BrowserSession>(
        &self,
        session: &mut S,
        scope: &DocumentScope,
        thumbnail: &ElementRef,
    ) -> Result<String, ThumbnailError> {
        let resolved = self.reveal_original(session, scope, thumbnail).await;
        self.dismiss_overlay(session).await;
        resolved
    }

    async fn reveal_original<S: BrowserSession>(
        &self,
        session: &mut S,
        scope: &DocumentScope,
        thumbnail: &ElementRef,
    ) -> Result<String, ThumbnailError> {
        session.click(thumbnail).await?;
        tokio::time::sleep(self.config.click_delay).await;

        let overlay = self
            .poll_overlay(session, scope)
            .await?
            .ok_or(ThumbnailError::OverlayMissing)?;

        match session.attribute(&overlay, "src").await? {
            Some(src) if is_http_url(&src) => Ok(src),
            Some(src) => Err(ThumbnailError::InvalidSource(src)),
            None => Err(ThumbnailError::InvalidSource("<none>".to_string())),
        }
    }

    /// Bounded poll for the viewer image.
    async fn poll_overlay<S: BrowserSession>(
        &self,
        session: &mut S,
        scope: &DocumentScope,
    ) -> DriverResult<Option<ElementRef>> {
        let selector = &self.config.selectors.overlay_image;

        for attempt in 1..=self.config.overlay_attempts {
            if let Some(image) = session.query_first(scope, selector).await? {
                debug!("Preview popup appeared after {} probe(s)", attempt);
                return Ok(Some(image));
            }
            tokio::time::sleep(self.config.overlay_poll_interval).await;
        }

        Ok(None)
    }

    /// Send the dismiss keystroke; failures are logged and swallowed.
    async fn dismiss_overlay<S: BrowserSession>(&self, session: &mut S) {
        if let Err(e) = session.press_key(&self.config.selectors.dismiss_key).await {
            debug!("Dismissing preview popup failed: {}", e);
        }
        tokio::time::sleep(self.config.dismiss_delay).await;
    }
}
