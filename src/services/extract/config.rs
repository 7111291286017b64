//! Timing budgets and platform selectors for the extractor.

use std::time::Duration;

/// CSS selectors and markers for the blog platform's post layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSelectors {
    /// Embedded post images that open the original-size viewer when clicked.
    pub thumbnail: String,
    /// Full-size image inside the viewer overlay.
    pub overlay_image: String,
    /// "Switch to PC version" link on the mobile site.
    pub desktop_switch: String,
    /// Name of the iframe holding the post body.
    pub content_frame: String,
    /// Substring of the page URL identifying the mobile site.
    pub mobile_marker: String,
    /// Key that dismisses the viewer overlay.
    pub dismiss_key: String,
}

impl Default for PlatformSelectors {
    fn default() -> Self {
        Self {
            thumbnail: "img.se-image-resource.egjs-visible".to_string(),
            overlay_image: "div.cpv__img_wrap img.cpv__img".to_string(),
            desktop_switch: "a#goToBase".to_string(),
            content_frame: "mainFrame".to_string(),
            mobile_marker: "m.blog.naver.com".to_string(),
            dismiss_key: "Escape".to_string(),
        }
    }
}

/// Wall-clock budgets for each blocking step of the extraction protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    pub navigation_timeout: Duration,
    /// Pause after load while page scripts rewrite the DOM.
    pub settle_delay: Duration,
    pub desktop_switch_timeout: Duration,
    pub frame_timeout: Duration,
    pub thumbnail_timeout: Duration,
    /// Interval between probes while waiting for a frame or selector.
    pub wait_poll_interval: Duration,
    /// Pause between clicking a thumbnail and the first overlay probe.
    pub click_delay: Duration,
    pub overlay_attempts: u32,
    pub overlay_poll_interval: Duration,
    /// Pause after each dismiss keystroke.
    pub dismiss_delay: Duration,
    pub selectors: PlatformSelectors,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(500),
            desktop_switch_timeout: Duration::from_secs(10),
            frame_timeout: Duration::from_secs(5),
            thumbnail_timeout: Duration::from_secs(10),
            wait_poll_interval: Duration::from_millis(100),
            click_delay: Duration::from_millis(300),
            overlay_attempts: 8,
            overlay_poll_interval: Duration::from_millis(200),
            dismiss_delay: Duration::from_millis(200),
            selectors: PlatformSelectors::default(),
        }
    }
}

impl ExtractorConfig {
    /// Upper bound on how long one thumbnail waits for its overlay.
    pub fn overlay_budget(&self) -> Duration {
        self.overlay_poll_interval * self.overlay_attempts
    }
}
