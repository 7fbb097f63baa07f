// Search cases

use anyhow::{Result, ensure};
use playwright_rs_pom::fixtures::Product;
use playwright_rs_pom::lifecycle::{CaseContext, CaseSpec, Category};
use playwright_rs_pom::pages::HomePage;

const HOME_PATH: &str = "/home";

pub fn cases() -> Vec<CaseSpec> {
    vec![
        CaseSpec::new("search_with_valid_term", valid_term)
            .describe("Verify search functionality with valid search term")
            .category(Category::Positive),
        CaseSpec::new("search_field_ui_validations", field_ui_validations)
            .describe("Verify search field UI validations")
            .category(Category::Positive),
        CaseSpec::new("search_results_structure", results_structure)
            .describe("Verify search results structure and pagination")
            .category(Category::Positive),
        CaseSpec::new("search_results_sort_by_price", sort_by_price)
            .describe("Verify sorting the results by price")
            .category(Category::Positive),
        CaseSpec::new("search_matches_api", matches_api)
            .describe("Verify the UI and the search API agree on the result count")
            .category(Category::Positive),
        CaseSpec::new("search_with_empty_term", empty_term)
            .describe("Verify search with empty term")
            .category(Category::Negative),
        CaseSpec::new("search_with_nonexistent_term", nonexistent_term)
            .describe("Verify search with non-existent term")
            .category(Category::Negative),
        CaseSpec::new("search_with_special_characters", special_characters)
            .describe("Verify search with special characters")
            .category(Category::Negative),
    ]
}

async fn valid_term(ctx: CaseContext) -> Result<()> {
    let term = "laptop";
    let home = ctx.open::<HomePage>(HOME_PATH).await?;
    let results = home.search(term).await?;

    ensure!(results.has_results().await?, "no results for {term:?}");
    let count = results.result_count().await?;
    ensure!(count > 0, "result count should be positive, got {count}");
    let titles = results.result_titles().await?;
    ensure!(
        titles.iter().any(|t| t.to_lowercase().contains(term)),
        "no title mentions {term:?}: {titles:?}"
    );
    ctx.pass(format!("{count} results: {titles:?}"));
    Ok(())
}

async fn field_ui_validations(ctx: CaseContext) -> Result<()> {
    let home = ctx.open::<HomePage>(HOME_PATH).await?;

    let field = home.validate_search_field().await?;
    ensure!(field.passed(), "search field checks failed: {field}");
    let components = home.validate_home_components().await?;
    ensure!(components.passed(), "home components missing: {components}");
    Ok(())
}

async fn results_structure(ctx: CaseContext) -> Result<()> {
    let home = ctx.open::<HomePage>(HOME_PATH).await?;
    let (displayed, results) = home.validate_search_results_display("computer").await?;

    ensure!(displayed, "results container not shown");
    ensure!(
        results.validate_structure().await?,
        "every result needs a title and a description"
    );
    ensure!(results.validate_pagination().await?, "pagination is incomplete");
    ensure!(results.has_filter_options().await?, "filter options not shown");
    Ok(())
}

async fn sort_by_price(ctx: CaseContext) -> Result<()> {
    let home = ctx.open::<HomePage>(HOME_PATH).await?;
    let results = home.search("laptop").await?;

    results.sort_by("price-asc").await?;
    let ascending = results.result_titles().await?;
    ensure!(
        ascending == ["Office Laptop", "Gaming Laptop"],
        "unexpected ascending order {ascending:?}"
    );

    results.sort_by("price-desc").await?;
    let descending = results.result_titles().await?;
    ensure!(
        descending == ["Gaming Laptop", "Office Laptop"],
        "unexpected descending order {descending:?}"
    );
    Ok(())
}

async fn matches_api(ctx: CaseContext) -> Result<()> {
    let term = "laptop";
    let home = ctx.open::<HomePage>(HOME_PATH).await?;
    let results = home.search(term).await?;
    let ui_count = results.result_count().await?;

    let response = ctx
        .api()
        .get::<Vec<Product>>("/products/search", Some(&[("q", term)]))
        .await?;
    ensure!(response.status.is_success(), "search API returned {}", response.status);
    let api_count = response.data.map(|found| found.len()).unwrap_or_default();
    ensure!(
        ui_count == api_count,
        "UI shows {ui_count} results, API returned {api_count}"
    );
    Ok(())
}

async fn empty_term(ctx: CaseContext) -> Result<()> {
    let home = ctx.open::<HomePage>(HOME_PATH).await?;
    ensure!(
        home.validate_empty_search().await?,
        "empty search was not handled"
    );
    Ok(())
}

async fn nonexistent_term(ctx: CaseContext) -> Result<()> {
    let home = ctx.open::<HomePage>(HOME_PATH).await?;
    let results = home.search("xyzabc12345nonexistent").await?;

    ensure!(
        results.has_no_results_message().await?,
        "no-results message not shown"
    );
    let count = results.result_count().await?;
    ensure!(count == 0, "expected 0 results, got {count}");
    Ok(())
}

async fn special_characters(ctx: CaseContext) -> Result<()> {
    let home = ctx.open::<HomePage>(HOME_PATH).await?;
    let results = home.search("!@#$%^&*()").await?;

    let handled = results.has_results().await? || results.has_no_results_message().await?;
    ensure!(handled, "special characters produced neither results nor a message");
    Ok(())
}
