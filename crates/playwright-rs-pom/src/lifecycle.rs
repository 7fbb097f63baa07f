//! Test lifecycle.
//!
//! [`TestRun`] owns everything that lives for the whole run: the logging
//! sink, configuration, database and API wrappers, the browser runtime and
//! the report. Each registered [`CaseSpec`] gets its own browser session and
//! a [`CaseContext`]; teardown captures a screenshot for a non-passing case,
//! runs the case's cleanup stack and always closes the session.
//!
//! # Example
//!
//! ```ignore
//! use playwright_rs_pom::lifecycle::{CaseSpec, Category, HarnessArgs, Suite, TestRun};
//! use playwright_rs_pom::pages::LoginPage;
//! use playwright_rs_pom::TestConfiguration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let suite = Suite::new("smoke").case(
//!         CaseSpec::new("login_form_is_complete", |ctx| async move {
//!             let login = ctx.open::<LoginPage>("/login").await?;
//!             anyhow::ensure!(login.validate_form_components().await?.passed());
//!             Ok(())
//!         })
//!         .category(Category::Positive),
//!     );
//!
//!     let run = TestRun::start(TestConfiguration::load()?).await?;
//!     let summary = run.run_suite(&suite, &HarnessArgs::default()).await;
//!     run.finish().await;
//!     std::process::exit(summary.exit_code());
//! }
//! ```

use crate::api::ApiClient;
use crate::cleanup::CleanupStack;
use crate::config::TestConfiguration;
use crate::db::Database;
use crate::driver::{BrowserRuntime, Driver, PlaywrightRuntime, SessionOptions};
use crate::error::Result;
use crate::logging::{self, LogSink};
use crate::pages::{BasePage, Screen, capture_screenshot};
use crate::report::{CaseEntryId, ReportSession};
use clap::Parser;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::{Duration, Instant};

/// Kind of scenario a case covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Positive,
    Negative,
    /// Crosses the UI, API and database
    Hybrid,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Positive => "Positive",
            Category::Negative => "Negative",
            Category::Hybrid => "Hybrid",
        })
    }
}

type CaseBody = Box<dyn Fn(CaseContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A registered test case.
pub struct CaseSpec {
    name: String,
    description: String,
    category: Category,
    needs_database: bool,
    body: CaseBody,
}

impl fmt::Debug for CaseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseSpec")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("needs_database", &self.needs_database)
            .finish()
    }
}

impl CaseSpec {
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            category: Category::Positive,
            needs_database: false,
            body: Box::new(move |ctx| body(ctx).boxed()),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Skip the case when the database is unreachable.
    pub fn needs_database(mut self) -> Self {
        self.needs_database = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An ordered collection of cases.
#[derive(Debug)]
pub struct Suite {
    name: String,
    cases: Vec<CaseSpec>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(mut self, case: CaseSpec) -> Self {
        self.cases.push(case);
        self
    }

    pub fn extend(&mut self, cases: impl IntoIterator<Item = CaseSpec>) {
        self.cases.extend(cases);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Cases selected by the harness arguments, in registration order.
    pub fn select<'a>(&'a self, args: &HarnessArgs) -> Vec<&'a CaseSpec> {
        self.cases.iter().filter(|c| args.matches(&c.name)).collect()
    }
}

/// Command line of the e2e harness.
///
/// Unknown flags (the ones cargo forwards to libtest harnesses) are ignored.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "e2e", about = "Page-object end-to-end suite", ignore_errors = true)]
pub struct HarnessArgs {
    /// Run only cases whose name contains this string
    pub filter: Option<String>,

    /// Require the filter to match the case name exactly
    #[arg(long)]
    pub exact: bool,

    /// List the selected cases without running them
    #[arg(long)]
    pub list: bool,

    #[arg(long, hide = true)]
    pub nocapture: bool,

    #[arg(long, hide = true)]
    pub test_threads: Option<usize>,

    #[arg(short, long, hide = true)]
    pub quiet: bool,
}

impl HarnessArgs {
    pub fn matches(&self, name: &str) -> bool {
        match &self.filter {
            None => true,
            Some(filter) if self.exact => name == filter,
            Some(filter) => name.contains(filter.as_str()),
        }
    }
}

/// How a case ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    /// The body returned an error or panicked
    Failed(String),
    /// The browser session could not be launched
    SetupFailed(String),
    Skipped(String),
}

impl CaseStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseStatus::Passed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CaseStatus::Failed(_) | CaseStatus::SetupFailed(_))
    }
}

/// Result of one case.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub name: String,
    pub category: Category,
    pub status: CaseStatus,
    pub duration: Duration,
    pub screenshot: Option<PathBuf>,
    /// Labels of cleanup actions that failed
    pub cleanup_failures: Vec<String>,
}

/// Results of a suite.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<CaseOutcome>,
    pub duration: Duration,
}

impl RunSummary {
    fn count(&self, f: impl Fn(&CaseStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(CaseStatus::is_passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CaseStatus::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Skipped(_)))
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit code: 0 when nothing failed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }
}

/// Run-scoped resources.
pub struct TestRun {
    config: Arc<TestConfiguration>,
    db: Database,
    database_available: bool,
    api: ApiClient,
    runtime: Arc<dyn BrowserRuntime>,
    report: Arc<ReportSession>,
    log_sink: Option<LogSink>,
}

impl fmt::Debug for TestRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRun")
            .field("database", &self.db.name())
            .field("database_available", &self.database_available)
            .field("report", &self.report.path())
            .finish()
    }
}

impl TestRun {
    /// Opens logging, builds the wrappers, checks the database and starts
    /// Playwright.
    pub async fn start(config: TestConfiguration) -> Result<Self> {
        let log_sink = logging::init();
        tracing::info!(
            api = config.api_base_url(),
            app = config.app_base_url(),
            database = config.mongo_database_name(),
            "Starting test run"
        );

        let db = Database::connect(&config).await?;
        let database_available = match db.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Database unavailable; database cases will be skipped");
                false
            }
        };
        let runtime = PlaywrightRuntime::start().await?;

        let mut run = Self::from_parts(config, db, database_available, Arc::new(runtime))?;
        run.log_sink = Some(log_sink);
        Ok(run)
    }

    /// Assembles a run around an existing database handle and browser runtime.
    pub fn from_parts(
        config: TestConfiguration,
        db: Database,
        database_available: bool,
        runtime: Arc<dyn BrowserRuntime>,
    ) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let report = Arc::new(
            ReportSession::new(config.report_path())
                .with_system_info("Application", config.app_base_url())
                .with_system_info("Headless", config.browser_headless().to_string()),
        );
        Ok(Self {
            config: Arc::new(config),
            db,
            database_available,
            api,
            runtime,
            report,
            log_sink: None,
        })
    }

    pub fn config(&self) -> &TestConfiguration {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_available(&self) -> bool {
        self.database_available
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn report(&self) -> &ReportSession {
        &self.report
    }

    /// Launches and closes one browser session, to find out whether a browser
    /// is available before any case runs.
    pub async fn preflight(&self) -> Result<()> {
        let options = SessionOptions::from_config(&self.config);
        let session = self.runtime.launch(&options).await?;
        session.close().await
    }

    /// Runs the selected cases one after another.
    pub async fn run_suite(&self, suite: &Suite, args: &HarnessArgs) -> RunSummary {
        let start = Instant::now();
        let cases = suite.select(args);
        tracing::info!(suite = suite.name(), cases = cases.len(), "Running suite");

        let mut outcomes = Vec::with_capacity(cases.len());
        for case in cases {
            outcomes.push(self.run_case(case).await);
        }

        let summary = RunSummary {
            outcomes,
            duration: start.elapsed(),
        };
        tracing::info!(
            passed = summary.passed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            duration = ?summary.duration,
            "Suite finished"
        );
        summary
    }

    /// Runs one case with its own browser session.
    pub async fn run_case(&self, case: &CaseSpec) -> CaseOutcome {
        let start = Instant::now();
        let entry = self.report.begin_case(&case.name, &case.description);
        self.report
            .info(entry, format!("Category: {}", case.category));

        let mut outcome = CaseOutcome {
            name: case.name.clone(),
            category: case.category,
            status: CaseStatus::Passed,
            duration: Duration::ZERO,
            screenshot: None,
            cleanup_failures: Vec::new(),
        };

        if case.needs_database && !self.database_available {
            let reason = "database unavailable".to_string();
            tracing::warn!(case = %case.name, "Skipped: {reason}");
            self.report.skip(entry, &reason);
            outcome.status = CaseStatus::Skipped(reason);
            return self.end_case(entry, outcome, start);
        }

        let options = SessionOptions::from_config(&self.config);
        let session = match self.runtime.launch(&options).await {
            Ok(session) => session,
            Err(e) => {
                let message = format!("failed to launch browser session: {e}");
                tracing::error!(case = %case.name, "{message}");
                self.report.fail(entry, &message);
                outcome.status = CaseStatus::SetupFailed(message);
                return self.end_case(entry, outcome, start);
            }
        };

        tracing::info!(case = %case.name, "Case started");
        let driver = session.driver();
        let cleanup = Arc::new(CleanupStack::new());
        let ctx = CaseContext {
            name: Arc::from(case.name.as_str()),
            config: self.config.clone(),
            db: self.db.clone(),
            api: self.api.clone(),
            driver: driver.clone(),
            epoch: Arc::new(AtomicU64::new(0)),
            cleanup: cleanup.clone(),
            report: self.report.clone(),
            entry,
            database_available: self.database_available,
        };

        outcome.status = match AssertUnwindSafe((case.body)(ctx)).catch_unwind().await {
            Ok(Ok(())) => CaseStatus::Passed,
            Ok(Err(e)) => CaseStatus::Failed(format!("{e:#}")),
            Err(panic) => CaseStatus::Failed(panic_message(panic.as_ref())),
        };

        match &outcome.status {
            CaseStatus::Passed => self.report.pass(entry, "Test passed"),
            CaseStatus::Failed(message) => {
                tracing::error!(case = %case.name, error = %message, "Case failed");
                self.report.fail(entry, message);
            }
            _ => {}
        }

        // Teardown: screenshot, cleanup, close. Each step runs even if the
        // previous one failed.
        if !outcome.status.is_passed() && self.config.take_screenshots() {
            match capture_screenshot(driver.as_ref(), &self.config, &case.name).await {
                Ok(path) => {
                    tracing::info!(case = %case.name, path = %path.display(), "Failure screenshot saved");
                    self.report.attach_screenshot(entry, &path);
                    outcome.screenshot = Some(path);
                }
                Err(e) => tracing::warn!(case = %case.name, error = %e, "Failure screenshot not captured"),
            }
        }

        for failure in cleanup.run().await {
            self.report
                .info(entry, format!("Cleanup '{}' failed: {}", failure.label, failure.error));
            outcome.cleanup_failures.push(failure.label);
        }

        if let Err(e) = session.close().await {
            tracing::warn!(case = %case.name, error = %e, "Browser session did not close cleanly");
        }

        self.end_case(entry, outcome, start)
    }

    fn end_case(&self, entry: CaseEntryId, mut outcome: CaseOutcome, start: Instant) -> CaseOutcome {
        outcome.duration = start.elapsed();
        self.report.end_case(entry, outcome.duration);
        match &outcome.status {
            CaseStatus::Passed => {
                tracing::info!(case = %outcome.name, duration = ?outcome.duration, "✓ passed")
            }
            CaseStatus::Skipped(_) => tracing::info!(case = %outcome.name, "- skipped"),
            _ => tracing::error!(case = %outcome.name, duration = ?outcome.duration, "✗ failed"),
        }
        outcome
    }

    /// Writes the report, stops the browser runtime and closes logging.
    ///
    /// Returns the report path when it was written.
    pub async fn finish(self) -> Option<PathBuf> {
        let report_path = match self.report.flush() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(error = %e, "Test report not written");
                None
            }
        };
        if let Err(e) = self.runtime.shutdown().await {
            tracing::warn!(error = %e, "Browser runtime did not shut down cleanly");
        }
        tracing::info!("Test run finished");
        drop(self.log_sink);
        report_path
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "case panicked".to_string()
    }
}

/// Everything a case body can reach. Cheap to clone.
#[derive(Clone)]
pub struct CaseContext {
    name: Arc<str>,
    config: Arc<TestConfiguration>,
    db: Database,
    api: ApiClient,
    driver: Arc<dyn Driver>,
    epoch: Arc<AtomicU64>,
    cleanup: Arc<CleanupStack>,
    report: Arc<ReportSession>,
    entry: CaseEntryId,
    database_available: bool,
}

impl fmt::Debug for CaseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseContext")
            .field("name", &self.name)
            .field("url", &self.driver.url())
            .finish()
    }
}

impl CaseContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TestConfiguration {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn database_available(&self) -> bool {
        self.database_available
    }

    /// URL the browser currently shows.
    pub fn current_url(&self) -> String {
        self.driver.url()
    }

    /// Absolute URL of an application page.
    pub fn app_url(&self, path: &str) -> Result<url::Url> {
        self.config.app_url(path)
    }

    /// Navigates to the application page at `path` and returns it as screen
    /// `S`. Screens opened earlier in this case become stale.
    pub async fn open<S: Screen>(&self, path: &str) -> Result<S> {
        let url = self.app_url(path)?;
        let mut base = self.base::<S>();
        base.navigate(url.as_str()).await?;
        Ok(S::from_base(base))
    }

    /// The page currently shown, as screen `S`, without navigating. Screens
    /// obtained earlier in this case become stale.
    pub fn screen<S: Screen>(&self) -> S {
        S::from_base(self.base::<S>())
    }

    fn base<S: Screen>(&self) -> BasePage {
        BasePage::new(
            self.driver.clone(),
            self.config.clone(),
            self.epoch.clone(),
            S::NAME,
        )
    }

    /// Registers a cleanup action that runs when the case exits.
    pub fn defer<F>(&self, label: impl Into<String>, action: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.cleanup.push(label, action);
    }

    /// Deletes document `id` from `collection` when the case exits.
    pub fn defer_delete(&self, collection: &str, id: &str) {
        let db = self.db.clone();
        let (collection, id) = (collection.to_string(), id.to_string());
        self.defer(format!("delete {collection}/{id}"), async move {
            db.delete(&collection, &id).await.map(|_| ())
        });
    }

    /// Empties `collection` when the case exits.
    pub fn defer_clear(&self, collection: &str) {
        let db = self.db.clone();
        let collection = collection.to_string();
        self.defer(format!("clear {collection}"), async move {
            db.clear(&collection).await.map(|_| ())
        });
    }

    /// Adds an info line to this case's report entry.
    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(case = %self.name, "{message}");
        self.report.info(self.entry, message);
    }

    /// Adds a pass line to this case's report entry.
    pub fn pass(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(case = %self.name, "{message}");
        self.report.pass(self.entry, message);
    }
}
