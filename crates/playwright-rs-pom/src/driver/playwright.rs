// Playwright-backed driver
//
// One session = one Chromium process, one context, one page. playwright-rs has
// no page-level default timeout: actions carry the session timeout in their
// options and reads without a timeout option are bounded here. Navigations
// wait for `networkidle`; waits after in-page actions (form posts, scripted
// redirects) poll the document instead.

use super::{BrowserRuntime, BrowserSession, Driver, SessionOptions};
use crate::error::{Error, Result};
use async_trait::async_trait;
use playwright_rs::{
    Browser, BrowserContext, BrowserContextOptions, CheckOptions, ClickOptions, FillOptions,
    GotoOptions, LaunchOptions, Page, Playwright, RecordVideo, ScreenshotOptions, ScreenshotType,
    SelectOptions, Viewport, WaitUntil,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// How long the page must stay unchanged before it counts as idle
const QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Interval between quiescence probes
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot of the document used to detect in-flight loads: ready state,
/// location, navigation origin and the number of fetched resources.
const QUIESCENCE_PROBE: &str = "[document.readyState, location.href, \
    performance.timeOrigin, performance.getEntriesByType('resource').length].join('|')";

/// Driver for a single Playwright page.
#[derive(Clone)]
pub struct PlaywrightDriver {
    page: Page,
    timeout: Duration,
}

impl PlaywrightDriver {
    pub fn new(page: Page, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    fn timeout_ms(&self) -> f64 {
        self.timeout.as_millis() as f64
    }

    fn goto_options(&self) -> GotoOptions {
        GotoOptions::new()
            .timeout(self.timeout)
            .wait_until(WaitUntil::NetworkIdle)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        selector: &str,
        read: impl Future<Output = std::result::Result<T, playwright_rs::Error>>,
    ) -> Result<T> {
        within_timeout(self.timeout, operation, selector, read).await
    }

    async fn probe(&self) -> Option<String> {
        match self.page.evaluate_value(QUIESCENCE_PROBE).await {
            Ok(snapshot) => Some(snapshot.trim_matches('"').to_string()),
            // The execution context is torn down while a navigation commits
            Err(e) => {
                tracing::trace!(error = %e, "Quiescence probe failed");
                None
            }
        }
    }
}

#[async_trait]
impl Driver for PlaywrightDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "Navigating");
        self.page.goto(url, Some(self.goto_options())).await?;
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        let mut last: Option<String> = None;
        let mut stable_since = Instant::now();

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout(format!(
                    "page at '{}' did not settle within {:?}",
                    self.page.url(),
                    self.timeout
                )));
            }

            match self.probe().await {
                Some(snapshot) if snapshot.starts_with("complete|") => {
                    if last.as_deref() == Some(snapshot.as_str()) {
                        if now.duration_since(stable_since) >= QUIET_WINDOW {
                            return Ok(());
                        }
                    } else {
                        last = Some(snapshot);
                        stable_since = now;
                    }
                }
                _ => last = None,
            }

            sleep(POLL_INTERVAL).await;
        }
    }

    async fn reload(&self) -> Result<()> {
        self.page.reload(Some(self.goto_options())).await?;
        Ok(())
    }

    fn url(&self) -> String {
        self.page.url()
    }

    async fn title(&self) -> Result<String> {
        Ok(self.page.title().await?)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let options = ClickOptions::builder().timeout(self.timeout_ms()).build();
        self.page.locator(selector).await.click(Some(options)).await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let options = FillOptions::builder().timeout(self.timeout_ms()).build();
        self.page
            .locator(selector)
            .await
            .fill(value, Some(options))
            .await?;
        Ok(())
    }

    async fn check(&self, selector: &str) -> Result<()> {
        let options = CheckOptions::builder().timeout(self.timeout_ms()).build();
        self.page.locator(selector).await.check(Some(options)).await?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<Vec<String>> {
        let options = SelectOptions::builder().timeout(self.timeout_ms()).build();
        Ok(self
            .page
            .locator(selector)
            .await
            .select_option(value, Some(options))
            .await?)
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        let locator = self.page.locator(selector).await;
        self.bounded("text_content", selector, locator.text_content())
            .await
    }

    async fn input_value(&self, selector: &str) -> Result<String> {
        let locator = self.page.locator(selector).await;
        self.bounded("input_value", selector, locator.input_value(None))
            .await
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let locator = self.page.locator(selector).await;
        self.bounded("get_attribute", selector, locator.get_attribute(name))
            .await
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.page.locator(selector).await.is_visible().await?)
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool> {
        let locator = self.page.locator(selector).await;
        self.bounded("is_enabled", selector, locator.is_enabled())
            .await
    }

    async fn is_focused(&self, selector: &str) -> Result<bool> {
        let locator = self.page.locator(selector).await;
        self.bounded("is_focused", selector, locator.is_focused())
            .await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.page.locator(selector).await.count().await?)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = ScreenshotOptions::builder()
            .screenshot_type(ScreenshotType::Png)
            .full_page(true)
            .build();
        self.page.screenshot_to_file(path, Some(options)).await?;
        Ok(())
    }
}

/// Runs a locator read under `timeout`, reporting an overrun as
/// [`Error::Timeout`].
async fn within_timeout<T, E>(
    timeout: Duration,
    operation: &str,
    selector: &str,
    read: impl Future<Output = std::result::Result<T, E>>,
) -> Result<T>
where
    Error: From<E>,
{
    match tokio::time::timeout(timeout, read).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(Error::Timeout(format!(
            "{operation} on '{selector}' did not finish within {timeout:?}"
        ))),
    }
}

/// Run-scoped Playwright server connection.
pub struct PlaywrightRuntime {
    playwright: Playwright,
}

impl PlaywrightRuntime {
    /// Starts the Playwright server.
    pub async fn start() -> Result<Self> {
        let playwright = Playwright::launch()
            .await
            .map_err(|e| Error::from(e).context("starting Playwright"))?;
        tracing::info!("Playwright started");
        Ok(Self { playwright })
    }
}

#[async_trait]
impl BrowserRuntime for PlaywrightRuntime {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>> {
        let launch = LaunchOptions::new()
            .headless(options.headless)
            .slow_mo(options.slow_mo.as_millis() as f64)
            .timeout(options.timeout.as_millis() as f64);
        let browser = self
            .playwright
            .chromium()
            .launch_with_options(launch)
            .await
            .map_err(|e| Error::from(e).context("launching Chromium"))?;

        let mut context_options = BrowserContextOptions::builder().viewport(Viewport {
            width: options.viewport_width,
            height: options.viewport_height,
        });
        if let Some(dir) = &options.video_dir {
            context_options = context_options.record_video(RecordVideo {
                dir: dir.to_string_lossy().into_owned(),
                size: None,
            });
        }

        // A half-built session still owns the browser process
        let context = match browser
            .new_context_with_options(context_options.build())
            .await
        {
            Ok(context) => context,
            Err(e) => {
                let _ = browser.close().await;
                return Err(Error::from(e).context("creating browser context"));
            }
        };
        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                let _ = context.close().await;
                let _ = browser.close().await;
                return Err(Error::from(e).context("opening page"));
            }
        };

        tracing::debug!(
            headless = options.headless,
            width = options.viewport_width,
            height = options.viewport_height,
            "Browser session opened"
        );
        Ok(Box::new(PlaywrightSession {
            browser,
            context,
            driver: Arc::new(PlaywrightDriver::new(page, options.timeout)),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.playwright.shutdown().await?;
        tracing::info!("Playwright stopped");
        Ok(())
    }
}

/// Browser, context and page owned by one case.
pub struct PlaywrightSession {
    browser: Browser,
    context: BrowserContext,
    driver: Arc<PlaywrightDriver>,
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    fn driver(&self) -> Arc<dyn Driver> {
        self.driver.clone()
    }

    async fn close(&self) -> Result<()> {
        // Closing the context finalizes any recorded video
        let context_result = self.context.close().await;
        let browser_result = self.browser.close().await;
        context_result?;
        browser_result?;
        tracing::debug!("Browser session closed");
        Ok(())
    }
}
