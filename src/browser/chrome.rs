//! Chrome DevTools (chromiumoxide) implementation of the browser capability.

#[cfg(feature = "browser")]
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use serde::de::DeserializeOwned;
#[cfg(feature = "browser")]
use serde::Deserialize;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::layout::Point;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

#[cfg(feature = "browser")]
use super::scripts;
#[cfg(feature = "browser")]
use super::error::within_budget;
use super::{
    BrowserEngineConfig, BrowserSession, DocumentScope, DriverError, DriverResult, ElementRef,
    SessionLauncher,
};

/// Launches a local Chrome, or attaches to a remote one, per extraction run.
pub struct ChromeLauncher {
    config: BrowserEngineConfig,
}

impl ChromeLauncher {
    /// Common Chrome executable paths to check.
    #[cfg(feature = "browser")]
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserEngineConfig {
        &self.config
    }
}

#[cfg(feature = "browser")]
impl ChromeLauncher {
    /// Find a Chrome executable in known locations, then on `PATH`.
    fn find_chrome() -> DriverResult<PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(DriverError::Launch(
            "Chrome/Chromium not found. Please install it:\n\
             - Arch/Manjaro: sudo pacman -S chromium\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or set BROWSER_URL to a remote DevTools endpoint"
                .to_string(),
        ))
    }

    async fn launch_local(&self) -> DriverResult<(Browser, Handler)> {
        info!("Launching browser (headless={})", self.config.headless);

        let chrome_path = Self::find_chrome()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .request_timeout(Duration::from_secs(self.config.timeout));

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg(format!("--lang={}", self.config.locale))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-accelerated-2d-canvas")
            .arg("--no-first-run")
            .arg("--no-zygote")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox") // Often needed for headless in containers/restricted environments
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| DriverError::Launch(format!("invalid browser config: {}", e)))?;

        Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))
    }

    /// Connect to a remote Chrome instance via its `/json/version` endpoint.
    async fn connect_remote(&self, url: &str) -> DriverResult<(Browser, Handler)> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, self.config.timeout
        );

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(Duration::from_secs(self.config.timeout))
            .send()
            .await
            .map_err(|e| DriverError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| DriverError::Launch(format!("bad browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::Launch("No webSocketDebuggerUrl in response".into()))?;

        info!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.timeout),
            ..Default::default()
        };

        Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))
    }

    /// Apply user agent, locale and viewport to a fresh page.
    async fn prepare_page(&self, page: &Page) -> DriverResult<()> {
        let ua = SetUserAgentOverrideParams::builder()
            .user_agent(self.config.user_agent.clone())
            .accept_language(self.config.accept_language())
            .build()
            .map_err(DriverError::Launch)?;
        page.execute(ua).await?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            self.config.viewport_width as i64,
            self.config.viewport_height as i64,
            1.0,
            false,
        ))
        .await?;

        Ok(())
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> DriverResult<ChromeSession> {
        let remote = self.config.remote_url.clone();
        let (mut browser, mut handler) = match remote.as_deref() {
            Some(url) => self.connect_remote(url).await?,
            None => self.launch_local().await?,
        };

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if remote.is_none() {
                    let _ = browser.close().await;
                }
                handler_task.abort();
                return Err(DriverError::Launch(format!("failed to open page: {}", e)));
            }
        };

        if let Err(e) = self.prepare_page(&page).await {
            // Best-effort; defaults still load the desktop layout in most cases
            warn!("Failed to apply page emulation settings: {}", e);
        }

        Ok(ChromeSession {
            browser,
            page,
            handler: handler_task,
            remote: remote.is_some(),
            closed: false,
        })
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> DriverResult<ChromeSession> {
        Err(DriverError::Launch(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(feature = "browser")]
#[derive(Deserialize)]
struct CountProbe {
    attached: bool,
    count: usize,
}

#[cfg(feature = "browser")]
#[derive(Deserialize)]
struct FrameProbe {
    present: bool,
}

#[cfg(feature = "browser")]
#[derive(Debug, Deserialize)]
struct ViewportPoint {
    x: f64,
    y: f64,
}

#[cfg(feature = "browser")]
#[derive(Deserialize)]
struct ElementProbe<T> {
    found: bool,
    value: Option<T>,
}

/// Windows virtual key codes for the keys the extractor sends.
#[cfg(feature = "browser")]
fn virtual_key_code(key: &str) -> i64 {
    match key {
        "Escape" => 27,
        "Enter" => 13,
        "Tab" => 9,
        _ => 0,
    }
}

/// A single page inside a launched or attached Chrome.
#[cfg(feature = "browser")]
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    remote: bool,
    closed: bool,
}

#[cfg(feature = "browser")]
impl ChromeSession {
    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed("browser session already closed".into()));
        }
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> DriverResult<T> {
        self.ensure_open()?;
        self.page
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|e| DriverError::Protocol(format!("unexpected script result: {}", e)))
    }

    /// Wait for DOM readiness; the caller bounds how long this may take.
    async fn wait_for_ready(&self) -> DriverResult<()> {
        let result = self
            .page
            .evaluate(scripts::WAIT_FOR_READY_SCRIPT.to_string())
            .await?;
        let state: String = result
            .into_value()
            .unwrap_or_else(|_| "unknown".to_string());
        debug!("Page ready state: {}", state);
        Ok(())
    }

    async fn dispatch_key(&self, key: &str, kind: DispatchKeyEventType) -> DriverResult<()> {
        let code = virtual_key_code(key);
        let params = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(key)
            .code(key)
            .windows_virtual_key_code(code)
            .native_virtual_key_code(code)
            .build()
            .map_err(DriverError::Protocol)?;
        self.page.execute(params).await?;
        Ok(())
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()> {
        self.ensure_open()?;
        info!("Navigating to {}", url);

        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| DriverError::Protocol(format!("Invalid URL: {}", e)))?;

        // Request and DOM readiness share one budget
        let load = async {
            self.page.execute(nav_params).await?;
            self.wait_for_ready().await
        };
        within_budget(timeout, load, || {
            format!(
                "Navigation timed out after {}s for {}",
                timeout.as_secs(),
                url
            )
        })
        .await
    }

    async fn wait_for_load(&mut self, timeout: Duration) -> DriverResult<()> {
        self.ensure_open()?;
        let settle = async {
            self.page.wait_for_navigation().await?;
            self.wait_for_ready().await
        };
        within_budget(timeout, settle, || {
            format!("navigation did not settle in {}s", timeout.as_secs())
        })
        .await
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        self.ensure_open()?;
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn has_frame(&mut self, name: &str) -> DriverResult<bool> {
        let probe: FrameProbe = self.eval(scripts::has_frame(name)).await?;
        Ok(probe.present)
    }

    async fn query_all(
        &mut self,
        scope: &DocumentScope,
        selector: &str,
    ) -> DriverResult<Vec<ElementRef>> {
        let probe: CountProbe = self.eval(scripts::count(scope, selector)).await?;
        if !probe.attached {
            return Err(DriverError::Protocol(format!("{} is not attached", scope)));
        }
        Ok((0..probe.count)
            .map(|index| ElementRef::new(scope.clone(), selector, index))
            .collect())
    }

    async fn is_visible(&mut self, element: &ElementRef) -> DriverResult<bool> {
        let probe: ElementProbe<bool> = self.eval(scripts::is_visible(element)).await?;
        Ok(probe.found && probe.value.unwrap_or(false))
    }

    async fn click(&mut self, element: &ElementRef) -> DriverResult<()> {
        let probe: ElementProbe<ViewportPoint> = self.eval(scripts::click_point(element)).await?;
        let target = match probe.value {
            Some(target) if probe.found => target,
            _ => {
                return Err(DriverError::Protocol(format!(
                    "element {}[{}] not found in {}",
                    element.selector, element.index, element.scope
                )))
            }
        };

        // Real mouse input so the click is trusted and focuses the frame
        debug!("Clicking {}[{}] at {:?}", element.selector, element.index, target);
        self.page.click(Point::new(target.x, target.y)).await?;
        Ok(())
    }

    async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> DriverResult<Option<String>> {
        let probe: ElementProbe<String> = self.eval(scripts::attribute(element, name)).await?;
        if !probe.found {
            return Err(DriverError::Protocol(format!(
                "element {}[{}] not found in {}",
                element.selector, element.index, element.scope
            )));
        }
        Ok(probe.value)
    }

    async fn press_key(&mut self, key: &str) -> DriverResult<()> {
        self.ensure_open()?;
        self.dispatch_key(key, DispatchKeyEventType::KeyDown).await?;
        self.dispatch_key(key, DispatchKeyEventType::KeyUp).await
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Close the page to prevent tab accumulation on shared remote browsers
        let page_result = self.page.clone().close().await;
        let browser_result = if self.remote {
            Ok(())
        } else {
            self.browser.close().await.map(|_| ())
        };
        self.handler.abort();

        page_result?;
        browser_result?;
        Ok(())
    }
}

#[cfg(feature = "browser")]
impl Drop for ChromeSession {
    fn drop(&mut self) {
        if !self.closed {
            self.handler.abort();
        }
    }
}

/// Uninhabited without the `browser` feature; the launcher always fails.
#[cfg(not(feature = "browser"))]
pub enum ChromeSession {}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> DriverResult<()> {
        match *self {}
    }

    async fn wait_for_load(&mut self, _timeout: Duration) -> DriverResult<()> {
        match *self {}
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        match *self {}
    }

    async fn has_frame(&mut self, _name: &str) -> DriverResult<bool> {
        match *self {}
    }

    async fn query_all(
        &mut self,
        _scope: &DocumentScope,
        _selector: &str,
    ) -> DriverResult<Vec<ElementRef>> {
        match *self {}
    }

    async fn is_visible(&mut self, _element: &ElementRef) -> DriverResult<bool> {
        match *self {}
    }

    async fn click(&mut self, _element: &ElementRef) -> DriverResult<()> {
        match *self {}
    }

    async fn attribute(
        &mut self,
        _element: &ElementRef,
        _name: &str,
    ) -> DriverResult<Option<String>> {
        match *self {}
    }

    async fn press_key(&mut self, _key: &str) -> DriverResult<()> {
        match *self {}
    }

    async fn close(&mut self) -> DriverResult<()> {
        match *self {}
    }
}
