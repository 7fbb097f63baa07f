// Browser driver seam
//
// Page objects talk to the browser through `Driver`, and the lifecycle opens
// per-case sessions through `BrowserRuntime`. The Playwright implementation
// lives in `playwright`; unit tests use the in-memory DOM in `fake`.

use crate::config::TestConfiguration;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
pub(crate) mod fake;
mod playwright;

pub use playwright::{PlaywrightDriver, PlaywrightRuntime, PlaywrightSession};

/// Browser operations used by page objects.
///
/// Selectors follow Playwright syntax, including chained segments
/// (`".result-item >> nth=2 >> .title"`).
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigates and waits until the network has been idle.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Waits until the page reports no in-flight network activity for a
    /// quiescence window.
    async fn wait_for_network_idle(&self) -> Result<()>;

    /// Reloads the current page and waits until the network has been idle.
    async fn reload(&self) -> Result<()>;

    /// Last committed URL.
    fn url(&self) -> String;

    async fn title(&self) -> Result<String>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn check(&self, selector: &str) -> Result<()>;

    /// Selects an `<option>` by value and returns the selected values.
    async fn select_option(&self, selector: &str, value: &str) -> Result<Vec<String>>;

    async fn text_content(&self, selector: &str) -> Result<Option<String>>;

    async fn input_value(&self, selector: &str) -> Result<String>;

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Current visibility; does not wait. An absent element is not visible.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    async fn is_enabled(&self, selector: &str) -> Result<bool>;

    async fn is_focused(&self, selector: &str) -> Result<bool>;

    /// Number of elements currently matching; does not wait.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Writes a full-page PNG to `path`.
    async fn screenshot(&self, path: &Path) -> Result<()>;
}

/// Options applied when opening a per-case browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub headless: bool,
    pub slow_mo: Duration,
    /// Default timeout for every driver operation in the session
    pub timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Directory for session videos, when recording is enabled
    pub video_dir: Option<PathBuf>,
}

impl SessionOptions {
    pub fn from_config(config: &TestConfiguration) -> Self {
        Self {
            headless: config.browser_headless(),
            slow_mo: config.browser_slow_mo(),
            timeout: config.browser_timeout(),
            viewport_width: config.viewport_width(),
            viewport_height: config.viewport_height(),
            video_dir: config.record_videos().then(|| config.videos_dir()),
        }
    }
}

/// Run-scoped browser-automation handle.
#[async_trait]
pub trait BrowserRuntime: Send + Sync {
    /// Launches an isolated session: one browser, one context, one page.
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>>;

    /// Releases the runtime. Sessions must be closed first.
    async fn shutdown(&self) -> Result<()>;
}

/// Case-scoped browser session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Driver for the session's page.
    fn driver(&self) -> Arc<dyn Driver>;

    /// Closes the page, its context and the browser process.
    async fn close(&self) -> Result<()>;
}
