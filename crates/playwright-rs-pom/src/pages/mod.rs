//! Page objects.
//!
//! A screen wraps a [`BasePage`] and adds its own private selectors and
//! composed actions. Transitions consume the current screen and return the
//! next one; every screen also carries an epoch ticket so a value left behind
//! by another path (opening a second screen on the same session) is rejected
//! with [`Error::StaleScreen`](crate::Error::StaleScreen).

use crate::config::TestConfiguration;
use crate::driver::Driver;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

mod home;
mod login;
mod search_results;

pub use home::HomePage;
pub use login::{LoginPage, LoginRejected};
pub use search_results::SearchResultsPage;

/// Default wait for [`BasePage::is_visible`] (5 seconds)
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Interval between visibility probes (100ms)
const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A rendered screen of the application under test.
#[async_trait]
pub trait Screen: Sized + Send + Sync {
    /// Screen name used in logs and stale-use errors
    const NAME: &'static str;

    fn from_base(base: BasePage) -> Self;

    fn base(&self) -> &BasePage;

    fn into_base(self) -> BasePage;

    /// Whether the browser currently shows this screen.
    async fn is_loaded(&self) -> Result<bool>;
}

/// Shared primitives for every screen: navigation, element interaction,
/// validation helpers and screenshots.
pub struct BasePage {
    driver: Arc<dyn Driver>,
    config: Arc<TestConfiguration>,
    epoch: Arc<AtomicU64>,
    issued: u64,
    screen: &'static str,
}

impl fmt::Debug for BasePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasePage")
            .field("screen", &self.screen)
            .field("issued", &self.issued)
            .finish()
    }
}

impl BasePage {
    /// Issues a screen on a session, invalidating any screen issued before.
    pub fn new(
        driver: Arc<dyn Driver>,
        config: Arc<TestConfiguration>,
        epoch: Arc<AtomicU64>,
        screen: &'static str,
    ) -> Self {
        let issued = epoch.fetch_add(1, Ordering::SeqCst) + 1;
        Self {
            driver,
            config,
            epoch,
            issued,
            screen,
        }
    }

    /// Name of the screen this base belongs to.
    pub fn screen(&self) -> &'static str {
        self.screen
    }

    pub fn config(&self) -> &TestConfiguration {
        &self.config
    }

    /// Hands this session over to screen `S`.
    pub fn transition<S: Screen>(mut self) -> S {
        self.advance(S::NAME);
        tracing::debug!(screen = S::NAME, "Screen transition");
        S::from_base(self)
    }

    fn advance(&mut self, screen: &'static str) {
        self.issued = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.screen = screen;
    }

    fn ensure_current(&self) -> Result<()> {
        if self.epoch.load(Ordering::SeqCst) == self.issued {
            Ok(())
        } else {
            Err(Error::StaleScreen {
                screen: self.screen,
            })
        }
    }

    /// Loads `url` and waits for the network to go idle.
    ///
    /// Other screens on the same session become stale.
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        self.ensure_current()?;
        tracing::info!(screen = self.screen, url, "Navigating");
        self.driver.goto(url).await?;
        self.advance(self.screen);
        Ok(())
    }

    /// Waits until the page has had no network activity for a quiescence window.
    pub async fn wait_for_page_load(&self) -> Result<()> {
        self.ensure_current()?;
        self.driver.wait_for_network_idle().await
    }

    /// Reloads the current page and waits for the network to go idle.
    pub async fn reload(&self) -> Result<()> {
        self.ensure_current()?;
        tracing::info!(screen = self.screen, "Reloading");
        self.driver.reload().await
    }

    pub async fn title(&self) -> Result<String> {
        self.ensure_current()?;
        self.driver.title().await
    }

    pub fn current_url(&self) -> Result<String> {
        self.ensure_current()?;
        Ok(self.driver.url())
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        self.ensure_current()?;
        tracing::info!(screen = self.screen, selector, "Clicking");
        self.driver.click(selector).await
    }

    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.ensure_current()?;
        tracing::info!(screen = self.screen, selector, value, "Filling");
        self.driver.fill(selector, value).await
    }

    pub async fn check(&self, selector: &str) -> Result<()> {
        self.ensure_current()?;
        tracing::info!(screen = self.screen, selector, "Checking");
        self.driver.check(selector).await
    }

    pub async fn select_option(&self, selector: &str, value: &str) -> Result<Vec<String>> {
        self.ensure_current()?;
        tracing::info!(screen = self.screen, selector, value, "Selecting option");
        self.driver.select_option(selector, value).await
    }

    /// Trimmed text content; empty when the element has none.
    pub async fn read_text(&self, selector: &str) -> Result<String> {
        self.ensure_current()?;
        let text = self
            .driver
            .text_content(selector)
            .await?
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        tracing::info!(screen = self.screen, selector, text, "Read text");
        Ok(text)
    }

    /// [`is_visible_within`](Self::is_visible_within) with the default
    /// 5 second wait.
    pub async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.is_visible_within(selector, DEFAULT_VISIBILITY_TIMEOUT)
            .await
    }

    /// Polls until `selector` is visible. Returns `Ok(false)` once `timeout`
    /// elapses, even if a single probe is still in flight.
    pub async fn is_visible_within(&self, selector: &str, timeout: Duration) -> Result<bool> {
        self.ensure_current()?;
        let poll = async {
            loop {
                if self.driver.is_visible(selector).await? {
                    return Ok::<_, Error>(true);
                }
                tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
            }
        };
        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(screen = self.screen, selector, ?timeout, "Element not visible");
                Ok(false)
            }
        }
    }

    pub async fn is_enabled(&self, selector: &str) -> Result<bool> {
        self.ensure_current()?;
        self.driver.is_enabled(selector).await
    }

    pub async fn is_focused(&self, selector: &str) -> Result<bool> {
        self.ensure_current()?;
        self.driver.is_focused(selector).await
    }

    pub async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        self.ensure_current()?;
        self.driver.attribute(selector, name).await
    }

    /// Number of elements currently matching `selector`.
    pub async fn count(&self, selector: &str) -> Result<usize> {
        self.ensure_current()?;
        self.driver.count(selector).await
    }

    /// Case-insensitive containment of `expected` in the element text.
    pub async fn validate_text(&self, selector: &str, expected: &str) -> Result<bool> {
        let actual = self.read_text(selector).await?;
        let passed = actual.to_lowercase().contains(&expected.to_lowercase());
        tracing::info!(screen = self.screen, selector, expected, actual, passed, "Validated text");
        Ok(passed)
    }

    /// Exact match of the input's current value.
    pub async fn validate_input_value(&self, selector: &str, expected: &str) -> Result<bool> {
        self.ensure_current()?;
        let actual = self.driver.input_value(selector).await?;
        let passed = actual == expected;
        tracing::info!(screen = self.screen, selector, expected, actual, passed, "Validated input value");
        Ok(passed)
    }

    /// Fills `input` with `term`, clicks `submit` and waits for the page to
    /// settle. The empty term is submitted like any other.
    pub async fn perform_search(&self, input: &str, term: &str, submit: &str) -> Result<()> {
        self.fill(input, term).await?;
        self.click(submit).await?;
        self.wait_for_page_load().await
    }

    /// Writes a full-page PNG to `{reportPath}/Screenshots/{name}_{timestamp}.png`.
    pub async fn screenshot(&self, name: &str) -> Result<PathBuf> {
        self.ensure_current()?;
        let path = capture_screenshot(self.driver.as_ref(), &self.config, name).await?;
        tracing::info!(screen = self.screen, path = %path.display(), "Screenshot saved");
        Ok(path)
    }
}

/// Screenshot helper shared with the lifecycle's failure capture, which runs
/// without a screen.
pub(crate) async fn capture_screenshot(
    driver: &dyn Driver,
    config: &TestConfiguration,
    name: &str,
) -> Result<PathBuf> {
    let dir = config.screenshots_dir();
    tokio::fs::create_dir_all(&dir).await?;
    let file = format!(
        "{}_{}.png",
        sanitize_file_name(name),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(file);
    driver.screenshot(&path).await?;
    Ok(path)
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Selector for the `index`-th (zero based) match of `selector`.
pub fn nth(selector: &str, index: usize) -> String {
    format!("{selector} >> nth={index}")
}

/// Selector for `child` inside `parent`.
pub fn within(parent: &str, child: &str) -> String {
    format!("{parent} >> {child}")
}

/// Ordered named sub-checks of a screen validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    checks: Vec<(&'static str, bool)>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &'static str, passed: bool) {
        self.checks.push((name, passed));
    }

    /// True when every check passed (and vacuously for an empty report).
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|(_, passed)| *passed)
    }

    /// Names of the failed checks, in order.
    pub fn failures(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|(_, passed)| !passed)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn checks(&self) -> &[(&'static str, bool)] {
        &self.checks
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, passed)) in self.checks.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {}", if *passed { "ok" } else { "FAILED" })?;
        }
        Ok(())
    }
}
