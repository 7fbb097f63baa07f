//! End-to-end suite entry point
//!
//! Serves the storefront under test on an ephemeral port, points the run at
//! it and executes the login, search and hybrid cases through the lifecycle.
//! Run with: cargo test --package playwright-rs-pom --test e2e [-- FILTER]

mod search;

use app::{AppServer, Store};
use clap::Parser;
use playwright_rs_pom::{Error, HarnessArgs, Suite, TestConfiguration, TestRun};

/// Set to require a browser; otherwise the suite is skipped when none can be
/// launched.
const REQUIRE_BROWSER_ENV: &str = "E2E_REQUIRE_BROWSER";

fn suite() -> Suite {
    let mut suite = Suite::new("storefront");
    suite.extend(login::cases());
    suite.extend(search::cases());
    suite.extend(hybrid::cases());
    suite
}

fn main() {
    let args = HarnessArgs::parse();
    let suite = suite();

    if args.list {
        for case in suite.select(&args) {
            println!("{}: test", case.name());
        }
        return;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {e}");
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(&suite, &args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}

async fn async_main(suite: &Suite, args: &HarnessArgs) -> anyhow::Result<bool> {
    let server = AppServer::bind().await?;
    let config = TestConfiguration::load()?.with_base_url(server.url());

    let run = match TestRun::start(config).await {
        Ok(run) => run,
        Err(e)
            if matches!(e.root(), Error::Browser(_))
                && std::env::var_os(REQUIRE_BROWSER_ENV).is_none() =>
        {
            eprintln!("Skipping {} cases: Playwright is unavailable ({e})", suite.len());
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = run.preflight().await {
        if std::env::var_os(REQUIRE_BROWSER_ENV).is_none() {
            eprintln!("Skipping {} cases: no browser could be launched ({e})", suite.len());
            run.finish().await;
            return Ok(true);
        }
    }

    let store = if run.database_available() {
        Store::database(run.database().clone()).await?
    } else {
        Store::memory()
    };
    let app = server.serve(store);

    let summary = run.run_suite(suite, args).await;
    app.shutdown();
    let report = run.finish().await;

    println!();
    for outcome in &summary.outcomes {
        let mark = match &outcome.status {
            s if s.is_passed() => "ok",
            s if s.is_failure() => "FAILED",
            _ => "skipped",
        };
        println!("test {} ... {mark}", outcome.name);
    }
    println!(
        "\ntest result: {}. {} passed; {} failed; {} skipped; finished in {:.2}s",
        if summary.success() { "ok" } else { "FAILED" },
        summary.passed(),
        summary.failed(),
        summary.skipped(),
        summary.duration.as_secs_f64()
    );
    if let Some(report) = report {
        println!("report: {}", report.display());
    }

    Ok(summary.success())
}
