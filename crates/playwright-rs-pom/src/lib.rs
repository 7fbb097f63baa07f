//! playwright-rs-pom: Page-object end-to-end testing on top of playwright-rs
//!
//! This crate provides the pieces an end-to-end suite for a web application
//! is built from:
//!
//! - [`config`]: typed `appsettings.json` loading
//! - [`api`]: JSON REST client with status and latency checks
//! - [`db`]: MongoDB collection wrapper for arranging and verifying data
//! - [`pages`]: the page-object base and the Login, Home and SearchResults screens
//! - [`fixtures`]: canned and generated users and products
//! - [`lifecycle`]: per-case browser sessions, cleanup, screenshots and the HTML report
//!
//! # Examples
//!
//! ## A Login Case
//!
//! ```ignore
//! use playwright_rs_pom::fixtures;
//! use playwright_rs_pom::lifecycle::{CaseSpec, Category};
//! use playwright_rs_pom::pages::LoginPage;
//!
//! let case = CaseSpec::new("login_with_valid_credentials", |ctx| async move {
//!     let creds = fixtures::credentials();
//!     let login = ctx.open::<LoginPage>("/login").await?;
//!     let home = match login.login(creds["valid_user"], creds["valid_password"]).await? {
//!         Ok(home) => home,
//!         Err(rejected) => anyhow::bail!("login rejected: {}", rejected.message),
//!     };
//!     anyhow::ensure!(home.welcome_message().await?.contains("Welcome"));
//!     Ok(())
//! })
//! .category(Category::Positive);
//! ```
//!
//! ## Cross-Checking UI, API and Database
//!
//! ```ignore
//! use playwright_rs_pom::fixtures;
//! use playwright_rs_pom::lifecycle::{CaseSpec, Category};
//!
//! let case = CaseSpec::new("api_user_appears_in_database", |ctx| async move {
//!     let user = fixtures::generate_users(1).remove(0);
//!     let created = ctx.api().post::<fixtures::User, _>("/users", &user).await?;
//!     ctx.defer_delete("users", &user.id);
//!     anyhow::ensure!(created.status.as_u16() == 201);
//!     anyhow::ensure!(ctx.db().get_by_id::<fixtures::User>("users", &user.id).await?.is_some());
//!     Ok(())
//! })
//! .category(Category::Hybrid)
//! .needs_database();
//! ```

pub mod api;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod driver;
mod error;
pub mod fixtures;
pub mod lifecycle;
pub mod logging;
pub mod pages;
pub mod report;

// Re-export error types
pub use error::{Error, Result};

// Re-export the configuration and wrappers
pub use api::{ApiClient, ApiResponse, ApiStatus};
pub use config::TestConfiguration;
pub use db::Database;

// Re-export the lifecycle entry points
pub use lifecycle::{CaseContext, CaseSpec, Category, HarnessArgs, RunSummary, Suite, TestRun};

// Re-export screens
pub use pages::{BasePage, HomePage, LoginPage, Screen, SearchResultsPage, ValidationReport};
