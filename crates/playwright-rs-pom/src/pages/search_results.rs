// Search results screen

use super::{BasePage, Screen, nth, within};
use crate::error::{Error, Result};
use async_trait::async_trait;

const SEARCH_RESULTS: &str = ".search-results";
const RESULT_ITEMS: &str = ".result-item";
const RESULT_COUNT: &str = ".result-count";
const NO_RESULTS_MESSAGE: &str = ".no-results";
const PAGINATION: &str = ".pagination";
const SORT_DROPDOWN: &str = "#sortBy";
const FILTER_OPTIONS: &str = ".filter-options";

const ITEM_TITLE: &str = ".title";
const ITEM_DESCRIPTION: &str = ".description";
const NEXT_PAGE: &str = ".next";
const PREVIOUS_PAGE: &str = ".prev";

#[derive(Debug)]
pub struct SearchResultsPage {
    base: BasePage,
}

#[async_trait]
impl Screen for SearchResultsPage {
    const NAME: &'static str = "SearchResultsPage";

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
        self.base.is_visible(SEARCH_RESULTS).await
    }
}

/// First integer in a count label such as "Showing 25 results"; 0 when the
/// label has no digits.
pub fn parse_result_count(label: &str) -> Result<usize> {
    let re = regex::Regex::new(r"\d+")
        .map_err(|e| Error::InvalidArgument(format!("count pattern: {e}")))?;
    Ok(re
        .find(label)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0))
}

impl SearchResultsPage {
    pub async fn result_count(&self) -> Result<usize> {
        let label = self.base.read_text(RESULT_COUNT).await?;
        parse_result_count(&label)
    }

    /// Titles of every result item, skipping empty ones.
    pub async fn result_titles(&self) -> Result<Vec<String>> {
        let items = self.base.count(RESULT_ITEMS).await?;
        let mut titles = Vec::with_capacity(items);
        for i in 0..items {
            let title = within(&nth(RESULT_ITEMS, i), ITEM_TITLE);
            if self.base.count(&title).await? == 0 {
                continue;
            }
            let text = self.base.read_text(&title).await?;
            if !text.is_empty() {
                titles.push(text);
            }
        }
        Ok(titles)
    }

    /// Picks a sort order and waits for the re-sorted results.
    pub async fn sort_by(&self, option: &str) -> Result<()> {
        self.base.select_option(SORT_DROPDOWN, option).await?;
        self.base.wait_for_page_load().await
    }

    /// Whether the first result item is shown. Visibility checks are strict,
    /// so the bare item selector cannot be used once there are two results.
    pub async fn has_results(&self) -> Result<bool> {
        self.base.is_visible(&nth(RESULT_ITEMS, 0)).await
    }

    pub async fn has_no_results_message(&self) -> Result<bool> {
        self.base.is_visible(NO_RESULTS_MESSAGE).await
    }

    pub async fn has_filter_options(&self) -> Result<bool> {
        self.base.is_visible(FILTER_OPTIONS).await
    }

    /// Every result item has a title and a description. False when there
    /// are no results.
    pub async fn validate_structure(&self) -> Result<bool> {
        if !self.has_results().await? {
            return Ok(false);
        }
        let items = self.base.count(RESULT_ITEMS).await?;
        for i in 0..items {
            let item = nth(RESULT_ITEMS, i);
            let has_title = self.base.count(&within(&item, ITEM_TITLE)).await? > 0;
            let has_description = self.base.count(&within(&item, ITEM_DESCRIPTION)).await? > 0;
            if !has_title || !has_description {
                tracing::info!(item = i, has_title, has_description, "Result item is incomplete");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Valid when no pagination is shown; otherwise a next or previous
    /// control must exist.
    pub async fn validate_pagination(&self) -> Result<bool> {
        if !self.base.is_visible(PAGINATION).await? {
            return Ok(true);
        }
        let next = self.base.count(&within(PAGINATION, NEXT_PAGE)).await?;
        let previous = self.base.count(&within(PAGINATION, PREVIOUS_PAGE)).await?;
        Ok(next > 0 || previous > 0)
    }
}
