// Test configuration
//
// Loads the hierarchical `appsettings.json` file into a typed, read-only
// snapshot. Every recognized key is required; a missing key fails the load.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "appsettings.json";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "E2E_CONFIG";

/// Immutable configuration snapshot for one test run.
///
/// # Example
///
/// ```ignore
/// use playwright_rs_pom::TestConfiguration;
///
/// let config = TestConfiguration::load()?;
/// assert!(config.viewport_width() > 0);
/// println!("API under test: {}", config.api_base_url());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TestConfiguration {
    #[serde(rename = "MongoDB")]
    mongodb: MongoSettings,
    #[serde(rename = "API")]
    api: ApiSettings,
    #[serde(rename = "Browser")]
    browser: BrowserSettings,
    #[serde(rename = "Reporting")]
    reporting: ReportingSettings,
    #[serde(rename = "Application", default)]
    application: Option<ApplicationSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MongoSettings {
    connection_string: String,
    database_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiSettings {
    base_url: String,
    /// Request timeout in milliseconds
    timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BrowserSettings {
    headless: bool,
    /// Slow-motion delay in milliseconds
    slow_mo: u64,
    /// Default per-operation timeout in milliseconds
    timeout: u64,
    viewport_width: u32,
    viewport_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReportingSettings {
    report_path: PathBuf,
    screenshots: bool,
    videos: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplicationSettings {
    base_url: String,
}

impl TestConfiguration {
    /// Loads the configuration from `$E2E_CONFIG`, or `appsettings.json` in the
    /// working directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_path(path)
    }

    /// Loads the configuration from a specific file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded test configuration");
        Ok(config)
    }

    /// Parses the configuration from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Points both the application and the API at `base_url`.
    ///
    /// Used by harnesses that serve the application under test on an
    /// ephemeral port. Apply before the run starts.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api.base_url = base_url.clone();
        self.application = Some(ApplicationSettings { base_url });
        self
    }

    /// Replaces the report output directory.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.reporting.report_path = path.into();
        self
    }

    pub fn mongo_connection_string(&self) -> &str {
        &self.mongodb.connection_string
    }

    pub fn mongo_database_name(&self) -> &str {
        &self.mongodb.database_name
    }

    pub fn api_base_url(&self) -> &str {
        &self.api.base_url
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout)
    }

    /// Base URL page objects navigate under. Falls back to the API base URL.
    pub fn app_base_url(&self) -> &str {
        self.application
            .as_ref()
            .map(|app| app.base_url.as_str())
            .unwrap_or(&self.api.base_url)
    }

    /// Absolute URL of an application page, e.g. `app_url("/login")`.
    pub fn app_url(&self, path: &str) -> Result<url::Url> {
        crate::api::join_path(&url::Url::parse(self.app_base_url())?, path)
    }

    pub fn browser_headless(&self) -> bool {
        self.browser.headless
    }

    pub fn browser_slow_mo(&self) -> Duration {
        Duration::from_millis(self.browser.slow_mo)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser.timeout)
    }

    pub fn viewport_width(&self) -> u32 {
        self.browser.viewport_width
    }

    pub fn viewport_height(&self) -> u32 {
        self.browser.viewport_height
    }

    pub fn report_path(&self) -> &Path {
        &self.reporting.report_path
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.reporting.report_path.join("Screenshots")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.reporting.report_path.join("Videos")
    }

    pub fn take_screenshots(&self) -> bool {
        self.reporting.screenshots
    }

    pub fn record_videos(&self) -> bool {
        self.reporting.videos
    }
}
