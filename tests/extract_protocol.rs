//! Extraction protocol tests against a scripted in-memory browser session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use naverdl::browser::{
    BrowserSession, DocumentScope, DriverError, DriverResult, ElementRef, SessionLauncher,
};
use naverdl::services::extract::NO_IMAGES_FOUND;
use naverdl::services::{ExtractorConfig, ImageExtractor, PlatformSelectors};

const FRAME: &str = "mainFrame";

/// What clicking a thumbnail does.
#[derive(Clone)]
enum Overlay {
    /// Viewer opens with this `src` attribute.
    Src(Option<String>),
    /// Viewer never appears.
    Never,
    /// The page dies on click.
    Closes,
}

#[derive(Clone)]
struct Thumb {
    visible: bool,
    overlay: Overlay,
}

impl Thumb {
    fn image(url: &str) -> Self {
        Self {
            visible: true,
            overlay: Overlay::Src(Some(url.to_string())),
        }
    }

    fn hidden() -> Self {
        Self {
            visible: false,
            overlay: Overlay::Never,
        }
    }

    fn with_overlay(overlay: Overlay) -> Self {
        Self {
            visible: true,
            overlay,
        }
    }
}

/// Scripted page the fake session serves.
#[derive(Clone)]
struct Page {
    url: String,
    in_frame: bool,
    thumbnails: Vec<Thumb>,
    /// Thumbnails never match the selector.
    never_ready: bool,
    /// Page is closed while waiting for thumbnails.
    closed_while_waiting: bool,
    /// Thumbnails match only the first probe.
    vanishes_after_ready: bool,
    desktop_switch: bool,
    navigate_error: Option<String>,
}

impl Page {
    fn desktop(thumbnails: Vec<Thumb>) -> Self {
        Self {
            url: "https://blog.naver.com/user/1".to_string(),
            in_frame: true,
            thumbnails,
            never_ready: false,
            closed_while_waiting: false,
            vanishes_after_ready: false,
            desktop_switch: false,
            navigate_error: None,
        }
    }
}

type CallLog = Arc<Mutex<Vec<String>>>;

struct FakeSession {
    page: Page,
    selectors: PlatformSelectors,
    log: CallLog,
    open_overlay: Option<usize>,
    thumbnail_probes: usize,
    closed: bool,
}

impl FakeSession {
    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed {
            Err(DriverError::Closed("session closed".into()))
        } else {
            Ok(())
        }
    }

    fn content_scope(&self) -> DocumentScope {
        if self.page.in_frame {
            DocumentScope::Frame(FRAME.to_string())
        } else {
            DocumentScope::TopLevel
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> DriverResult<()> {
        self.record(format!("navigate {}", url));
        match &self.page.navigate_error {
            Some(message) => Err(DriverError::Timeout(message.clone())),
            None => Ok(()),
        }
    }

    async fn wait_for_load(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.ensure_open()
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        self.ensure_open()?;
        Ok(self.page.url.clone())
    }

    async fn has_frame(&mut self, name: &str) -> DriverResult<bool> {
        self.ensure_open()?;
        Ok(self.page.in_frame && name == FRAME)
    }

    async fn query_all(
        &mut self,
        scope: &DocumentScope,
        selector: &str,
    ) -> DriverResult<Vec<ElementRef>> {
        self.ensure_open()?;

        let count = if selector == self.selectors.thumbnail {
            if self.page.closed_while_waiting {
                self.closed = true;
                return Err(DriverError::Closed("page crashed".into()));
            }
            self.thumbnail_probes += 1;
            let vanished = self.page.vanishes_after_ready && self.thumbnail_probes > 1;
            if self.page.never_ready || vanished || *scope != self.content_scope() {
                0
            } else {
                self.page.thumbnails.len()
            }
        } else if selector == self.selectors.overlay_image {
            match self.open_overlay.map(|i| &self.page.thumbnails[i].overlay) {
                Some(Overlay::Src(_)) if *scope == self.content_scope() => 1,
                _ => 0,
            }
        } else if selector == self.selectors.desktop_switch {
            usize::from(self.page.desktop_switch && *scope == DocumentScope::TopLevel)
        } else {
            0
        };

        Ok((0..count)
            .map(|i| ElementRef::new(scope.clone(), selector, i))
            .collect())
    }

    async fn is_visible(&mut self, element: &ElementRef) -> DriverResult<bool> {
        self.ensure_open()?;
        if element.selector == self.selectors.thumbnail {
            Ok(self.page.thumbnails[element.index].visible)
        } else {
            Ok(true)
        }
    }

    async fn click(&mut self, element: &ElementRef) -> DriverResult<()> {
        self.ensure_open()?;

        if element.selector == self.selectors.desktop_switch {
            self.record("click desktop".to_string());
            self.page.url = self.page.url.replace("m.blog.naver.com", "blog.naver.com");
            self.page.in_frame = true;
            return Ok(());
        }

        self.record(format!("click {}", element.index + 1));
        match self.page.thumbnails[element.index].overlay {
            Overlay::Closes => {
                self.closed = true;
                Err(DriverError::Closed("target closed".into()))
            }
            _ => {
                self.open_overlay = Some(element.index);
                Ok(())
            }
        }
    }

    async fn attribute(
        &mut self,
        _element: &ElementRef,
        name: &str,
    ) -> DriverResult<Option<String>> {
        self.ensure_open()?;
        assert_eq!(name, "src");
        match self.open_overlay.map(|i| &self.page.thumbnails[i].overlay) {
            Some(Overlay::Src(src)) => Ok(src.clone()),
            _ => Err(DriverError::Protocol("no overlay".into())),
        }
    }

    async fn press_key(&mut self, key: &str) -> DriverResult<()> {
        self.record(format!("press {}", key));
        self.ensure_open()?;
        self.open_overlay = None;
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.record("close".to_string());
        self.closed = true;
        Ok(())
    }
}

struct FakeLauncher {
    page: Page,
    log: CallLog,
    fail_launch: bool,
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> DriverResult<FakeSession> {
        if self.fail_launch {
            return Err(DriverError::Launch("no chrome executable".into()));
        }
        Ok(FakeSession {
            page: self.page.clone(),
            selectors: PlatformSelectors::default(),
            log: self.log.clone(),
            open_overlay: None,
            thumbnail_probes: 0,
            closed: false,
        })
    }
}

fn fast_config() -> ExtractorConfig {
    ExtractorConfig {
        navigation_timeout: Duration::from_millis(50),
        settle_delay: Duration::from_millis(1),
        desktop_switch_timeout: Duration::from_millis(50),
        frame_timeout: Duration::from_millis(20),
        thumbnail_timeout: Duration::from_millis(30),
        wait_poll_interval: Duration::from_millis(5),
        click_delay: Duration::from_millis(1),
        overlay_attempts: 8,
        overlay_poll_interval: Duration::from_millis(1),
        dismiss_delay: Duration::from_millis(1),
        selectors: PlatformSelectors::default(),
    }
}

fn extractor(page: Page) -> (ImageExtractor<FakeLauncher>, CallLog) {
    let log = CallLog::default();
    let launcher = FakeLauncher {
        page,
        log: log.clone(),
        fail_launch: false,
    };
    (ImageExtractor::with_config(launcher, fast_config()), log)
}

fn cdn(name: &str) -> String {
    format!("https://postfiles.pstatic.net/MjAy/{}?type=w966", name)
}

#[tokio::test]
async fn test_collects_all_images_in_dom_order() {
    let urls = [cdn("a_1.jpg"), cdn("b_2.jpg"), cdn("c_3.png")];
    let page = Page::desktop(urls.iter().map(|u| Thumb::image(u)).collect());
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 3);
    assert_eq!(result.successful_fetches(), 3);
    assert_eq!(result.failure_fetches(), 0);
    assert_eq!(result.image_urls(), urls);
    assert!(result.errors().is_empty());

    let log = log.lock().unwrap();
    assert_eq!(log.iter().filter(|c| *c == "press Escape").count(), 3);
    assert_eq!(log.last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn test_overlay_timeout_is_isolated() {
    let page = Page::desktop(vec![
        Thumb::image(&cdn("a_1.jpg")),
        Thumb::with_overlay(Overlay::Never),
        Thumb::image(&cdn("c_3.jpg")),
    ]);
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 3);
    assert_eq!(result.successful_fetches(), 2);
    assert_eq!(result.failure_fetches(), 1);
    assert_eq!(result.image_urls(), [cdn("a_1.jpg"), cdn("c_3.jpg")]);
    assert!(result.errors()[0].starts_with("image 2:"));

    // Stray viewer is dismissed before thumbnail 3 is clicked
    let log = log.lock().unwrap();
    let click_2 = log.iter().position(|c| c == "click 2").unwrap();
    let click_3 = log.iter().position(|c| c == "click 3").unwrap();
    assert!(log[click_2..click_3].iter().any(|c| c == "press Escape"));
}

#[tokio::test]
async fn test_hidden_and_invalid_thumbnails_recorded() {
    let page = Page::desktop(vec![
        Thumb::hidden(),
        Thumb::with_overlay(Overlay::Src(Some("data:image/png;base64,AAAA".into()))),
        Thumb::with_overlay(Overlay::Src(None)),
        Thumb::image(&cdn("d_4.jpg")),
    ]);
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 4);
    assert_eq!(result.image_urls(), [cdn("d_4.jpg")]);
    assert_eq!(result.failure_fetches(), 3);
    assert_eq!(result.errors()[0], "image 1 is not visible");
    assert!(result.errors()[1].starts_with("image 2: invalid image link"));
    assert!(result.errors()[2].starts_with("image 3: invalid image link"));

    // Hidden thumbnails are never clicked
    assert!(!log.lock().unwrap().iter().any(|c| c == "click 1"));
}

#[tokio::test]
async fn test_closed_page_aborts_remaining_loop() {
    let page = Page::desktop(vec![
        Thumb::image(&cdn("a_1.jpg")),
        Thumb::with_overlay(Overlay::Closes),
        Thumb::image(&cdn("c_3.jpg")),
    ]);
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 3);
    assert_eq!(result.image_urls(), [cdn("a_1.jpg")]);
    assert_eq!(result.successful_fetches(), 1);
    assert_eq!(result.failure_fetches(), 1);
    assert_eq!(
        result.errors(),
        ["image 2: browser was closed while processing"]
    );
    assert!(!log.lock().unwrap().iter().any(|c| c == "click 3"));
}

#[tokio::test]
async fn test_readiness_timeout_counts_one_failure() {
    let mut page = Page::desktop(vec![Thumb::image(&cdn("a_1.jpg"))]);
    page.never_ready = true;
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 0);
    assert_eq!(result.successful_fetches(), 0);
    assert_eq!(result.failure_fetches(), 1);
    assert!(result.image_urls().is_empty());
    assert_eq!(result.errors(), ["timed out waiting for image elements"]);
    assert!(log.lock().unwrap().iter().any(|c| c == "close"));
}

#[tokio::test]
async fn test_readiness_closed_is_distinguished() {
    let mut page = Page::desktop(vec![Thumb::image(&cdn("a_1.jpg"))]);
    page.closed_while_waiting = true;
    let (extractor, _log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.failure_fetches(), 1);
    assert_eq!(result.errors().len(), 1);
    assert!(result.errors()[0].starts_with("browser/page was closed"));
}

#[tokio::test]
async fn test_page_without_images_is_benign() {
    // Thumbnails satisfy the readiness wait, then are gone on re-enumeration
    let mut page = Page::desktop(vec![Thumb::image(&cdn("a_1.jpg"))]);
    page.vanishes_after_ready = true;
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 0);
    assert_eq!(result.successful_fetches(), 0);
    assert_eq!(result.failure_fetches(), 0);
    assert_eq!(result.errors(), [NO_IMAGES_FOUND]);
    assert!(!log.lock().unwrap().iter().any(|c| c.starts_with("click")));
}

#[tokio::test]
async fn test_launch_failure_aborts_with_zero_counts() {
    let launcher = FakeLauncher {
        page: Page::desktop(Vec::new()),
        log: CallLog::default(),
        fail_launch: true,
    };
    let extractor = ImageExtractor::with_config(launcher, fast_config());

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 0);
    assert_eq!(result.successful_fetches(), 0);
    assert_eq!(result.failure_fetches(), 0);
    assert_eq!(result.errors().len(), 1);
    assert!(result.errors()[0].contains("no chrome executable"));
}

#[tokio::test]
async fn test_navigation_failure_aborts_and_closes() {
    let mut page = Page::desktop(vec![Thumb::image(&cdn("a_1.jpg"))]);
    page.navigate_error = Some("navigation exceeded 30000ms".into());
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.total_images(), 0);
    assert_eq!(result.failure_fetches(), 0);
    assert!(result.errors()[0].contains("navigation exceeded"));
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn test_mobile_page_switches_to_desktop() {
    let mut page = Page::desktop(vec![Thumb::image(&cdn("a_1.jpg"))]);
    page.url = "https://m.blog.naver.com/user/1".to_string();
    page.in_frame = false;
    page.desktop_switch = true;
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://m.blog.naver.com/user/1").await;

    assert_eq!(result.image_urls(), [cdn("a_1.jpg")]);
    assert!(log.lock().unwrap().iter().any(|c| c == "click desktop"));
}

#[tokio::test]
async fn test_missing_desktop_switch_is_not_fatal() {
    let mut page = Page::desktop(vec![Thumb::image(&cdn("a_1.jpg"))]);
    page.url = "https://m.blog.naver.com/user/1".to_string();
    page.in_frame = false;
    let (extractor, log) = extractor(page);

    let result = extractor.extract("https://m.blog.naver.com/user/1").await;

    assert_eq!(result.image_urls(), [cdn("a_1.jpg")]);
    assert!(!log.lock().unwrap().iter().any(|c| c == "click desktop"));
}

#[tokio::test]
async fn test_missing_frame_falls_back_to_page() {
    let mut page = Page::desktop(vec![Thumb::image(&cdn("a_1.jpg")), Thumb::image(&cdn("b_2.jpg"))]);
    page.in_frame = false;
    let (extractor, _log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(result.successful_fetches(), 2);
}

#[tokio::test]
async fn test_out_of_order_sequence_numbers_are_corrected() {
    let page = Page::desktop(vec![
        Thumb::image(&cdn("x_3.jpg")),
        Thumb::image(&cdn("x_1.jpg")),
        Thumb::image(&cdn("nonumber.jpg")),
        Thumb::image(&cdn("x_2.jpg")),
    ]);
    let (extractor, _log) = extractor(page);

    let result = extractor.extract("https://blog.naver.com/user/1").await;

    assert_eq!(
        result.image_urls(),
        [
            cdn("x_1.jpg"),
            cdn("x_2.jpg"),
            cdn("x_3.jpg"),
            cdn("nonumber.jpg")
        ]
    );
    assert_eq!(result.image_urls().len(), result.successful_fetches());
}
