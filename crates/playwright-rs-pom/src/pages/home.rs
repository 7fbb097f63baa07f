// Home screen shown after a successful login

use super::{BasePage, LoginPage, Screen, SearchResultsPage, ValidationReport};
use crate::error::Result;
use async_trait::async_trait;

const WELCOME_MESSAGE: &str = ".welcome-message";
const SEARCH_INPUT: &str = "#searchInput";
const SEARCH_BUTTON: &str = "#searchBtn";
const USER_PROFILE: &str = "#userProfile";
const LOGOUT_BUTTON: &str = "#logout";
const NAVIGATION_MENU: &str = ".nav-menu";
const SEARCH_RESULTS: &str = ".search-results";
const NO_RESULTS_MESSAGE: &str = ".no-results";

#[derive(Debug)]
pub struct HomePage {
    base: BasePage,
}

#[async_trait]
impl Screen for HomePage {
    const NAME: &'static str = "HomePage";

    fn from_base(base: BasePage) -> Self {
        Self { base }
    }

    fn base(&self) -> &BasePage {
        &self.base
    }

    fn into_base(self) -> BasePage {
        self.base
    }

    async fn is_loaded(&self) -> Result<bool> {
        self.base.is_visible(WELCOME_MESSAGE).await
    }
}

impl HomePage {
    pub async fn welcome_message(&self) -> Result<String> {
        self.base.read_text(WELCOME_MESSAGE).await
    }

    /// Submits `term` and moves to the results screen.
    pub async fn search(self, term: &str) -> Result<SearchResultsPage> {
        self.base
            .perform_search(SEARCH_INPUT, term, SEARCH_BUTTON)
            .await?;
        Ok(self.base.transition())
    }

    /// Signs out; the application returns to the login form.
    pub async fn logout(self) -> Result<LoginPage> {
        self.base.click(LOGOUT_BUTTON).await?;
        self.base.wait_for_page_load().await?;
        Ok(self.base.transition())
    }

    /// Search input is visible, enabled and has a placeholder. A hidden or
    /// missing input fails every check without probing it further.
    pub async fn validate_search_field(&self) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();
        if !self.base.is_visible(SEARCH_INPUT).await? {
            report.record("visible", false);
            report.record("enabled", false);
            report.record("placeholder", false);
            tracing::info!(%report, "Search field not shown");
            return Ok(report);
        }
        report.record("visible", true);
        report.record("enabled", self.base.is_enabled(SEARCH_INPUT).await?);
        let placeholder = self.base.attribute(SEARCH_INPUT, "placeholder").await?;
        report.record(
            "placeholder",
            placeholder.as_deref().is_some_and(|p| !p.is_empty()),
        );
        tracing::info!(%report, ?placeholder, "Search field validated");
        Ok(report)
    }

    /// Submits a blank search. Staying on the input with focus and showing a
    /// no-results indicator are both accepted.
    pub async fn validate_empty_search(&self) -> Result<bool> {
        self.base.fill(SEARCH_INPUT, "").await?;
        self.base.click(SEARCH_BUTTON).await?;

        if self.base.is_focused(SEARCH_INPUT).await? {
            tracing::info!("Empty search kept focus on the search input");
            return Ok(true);
        }
        let no_results = self.base.is_visible(NO_RESULTS_MESSAGE).await?;
        tracing::info!(no_results, "Empty search validated");
        Ok(no_results)
    }

    /// Searches for `term` and reports whether the results container showed up.
    pub async fn validate_search_results_display(
        self,
        term: &str,
    ) -> Result<(bool, SearchResultsPage)> {
        self.base
            .perform_search(SEARCH_INPUT, term, SEARCH_BUTTON)
            .await?;
        let displayed = self.base.is_visible(SEARCH_RESULTS).await?;
        Ok((displayed, self.base.transition()))
    }

    pub async fn validate_home_components(&self) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();
        for (name, selector) in [
            ("welcome message", WELCOME_MESSAGE),
            ("search input", SEARCH_INPUT),
            ("search button", SEARCH_BUTTON),
            ("navigation menu", NAVIGATION_MENU),
            ("user profile", USER_PROFILE),
        ] {
            report.record(name, self.base.is_visible(selector).await?);
        }
        tracing::info!(%report, "Home components validated");
        Ok(report)
    }
}
