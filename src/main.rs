//! Delta-Ripple main entry point
//!
//! This is the command-line interface for the Delta-Ripple state explorer.

use anyhow::Context;
use clap::Parser;
use delta_ripple::browser::{connect, WebDriverAnalyzer, WebDriverExecutor, WebDriverFormHandler};
use delta_ripple::config::{load_config_with_hash, Config};
use delta_ripple::crawler::{Collaborators, Crawler, SimilarityClusters};
use delta_ripple::output::{
    generate_report, load_statistics, print_statistics, write_markdown_report,
};
use delta_ripple::storage::SqliteStorage;
use delta_ripple::DomainHandler;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Delta-Ripple: a state explorer for dynamic web applications
///
/// Delta-Ripple drives a browser through a web application, executes its
/// clickable elements and records every resulting DOM change as a delta
/// page relative to the state it was observed on.
#[derive(Parser, Debug)]
#[command(name = "delta-ripple")]
#[command(version)]
#[command(about = "A state explorer for dynamic web applications", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear previously stored pages and URLs before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_report"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_report"])]
    stats: bool,

    /// Generate the markdown report from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_report: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("invalid configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_report {
        handle_export_report(&config)?;
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("delta_ripple=info,warn"),
            1 => EnvFilter::new("delta_ripple=debug,info"),
            2 => EnvFilter::new("delta_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Delta-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max delta depth: {}", config.crawler.max_delta_depth);
    println!("  Crawl speed: {:?}", config.crawler.crawl_speed);
    println!("  Max click retries: {}", config.crawler.max_click_retries);
    println!(
        "  Error ratio threshold: {}",
        config.crawler.error_ratio_threshold
    );

    println!("\nSimilarity:");
    println!(
        "  Duplicate threshold: {}",
        config.similarity.duplicate_threshold
    );
    println!(
        "  Login change threshold: {}",
        config.similarity.login_change_threshold
    );
    println!(
        "  Weights (clickables/forms/links): {}/{}/{}",
        config.similarity.clickable_weight,
        config.similarity.form_weight,
        config.similarity.link_weight
    );

    println!("\nScope:");
    if config.scope.allowed_domains.is_empty() {
        println!("  Allowed domains: host of the start URL");
    } else {
        for domain in &config.scope.allowed_domains {
            println!("  - {}", domain);
        }
    }
    for pattern in &config.scope.exclude_patterns {
        println!("  Excluding URLs containing: {}", pattern);
    }

    match &config.login {
        Some(login) => println!(
            "\nLogin: as {} via {} ({} fields)",
            login.username,
            login.url_with_login_form,
            login.data.len()
        ),
        None => println!("\nLogin: none"),
    }

    println!("\nWebDriver: {}", config.browser.webdriver_url);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Report: {}", config.output.report_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-report mode: writes the markdown report
fn handle_export_report(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Crawl Report ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.report_path);
    println!();

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    tracing::info!("Loading crawl data from database...");
    let report = generate_report(&storage, Vec::new())?;
    write_markdown_report(&report, Path::new(&config.output.report_path))
        .with_context(|| format!("cannot write {}", config.output.report_path))?;

    println!("✓ Report exported to: {}", config.output.report_path);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    if fresh {
        tracing::info!("Starting fresh crawl (clearing stored pages and URLs)");
        storage.clear()?;
    }

    let client = connect(&config.browser).await?;
    let speed = config.crawler.crawl_speed;
    let collaborators = Collaborators {
        analyzer: Box::new(WebDriverAnalyzer::new(client.clone(), speed)?),
        executor: Box::new(WebDriverExecutor::new(client.clone(), speed)),
        form_handler: Box::new(WebDriverFormHandler::new(client.clone(), speed)),
        frontier: Box::new(DomainHandler::from_config(&config)?),
        storage: Box::new(storage),
        clustering: Box::new(SimilarityClusters::new(&config.similarity)),
    };

    let report_path = config.output.report_path.clone();
    let mut crawler = Crawler::new(config, collaborators)?.with_config_hash(config_hash);
    let outcome = crawler.run().await;

    if let Err(e) = client.close().await {
        tracing::warn!("Failed to close the browser session: {}", e);
    }

    let summary = outcome.context("crawl failed")?;
    tracing::info!(
        "Crawl completed: {} pages, {} delta pages, {} URLs skipped",
        summary.web_pages,
        summary.delta_pages,
        summary.skipped_urls
    );

    let report = generate_report(crawler.storage(), crawler.clustering().clusters())?;
    write_markdown_report(&report, Path::new(&report_path))
        .with_context(|| format!("cannot write {}", report_path))?;
    tracing::info!("Report written to {}", report_path);

    Ok(())
}
