//! Agent-Harvest main entry point
//!
//! This is the command-line interface for the agent profile harvester.

use agent_harvest::config::{load_config_with_env, Config, SinkKind};
use agent_harvest::crawler::run_crawl;
use agent_harvest::{CrawlReport, ErrorKind};
use anyhow::Context;
use clap::Parser;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Agent-Harvest: a real-estate agent profile harvester
///
/// Walks the paginated agent directory, extracts one profile record per
/// agent and appends it to a CSV file, a SQLite table or a BigQuery table.
#[derive(Parser, Debug)]
#[command(name = "agent-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A real-estate agent profile harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config_with_env(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load default configuration".to_string(),
    })?;

    setup_logging(cli.verbose, cli.quiet, config.logging.file_path())?;

    match &cli.config {
        Some(path) => tracing::info!("Configuration loaded from: {}", path.display()),
        None => tracing::info!("Using default configuration"),
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let report = run_crawl(config).await.context("Crawl aborted")?;
    log_report(&report);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file configured, a second layer writes debug output to it;
/// the file is truncated on every run.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("agent_harvest=info,warn"),
            1 => EnvFilter::new("agent_harvest=debug,info"),
            2 => EnvFilter::new("agent_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = create_log_file(Path::new(path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("agent_harvest=debug,info")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn create_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
    }
    File::create(path).with_context(|| format!("Failed to create log file {}", path.display()))
}

/// Handles the --dry-run mode: shows the validated plan
fn handle_dry_run(config: &Config) {
    println!("=== Agent-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing URL: {}", config.site.listing_url);
    println!(
        "  Price range: {}",
        config.site.price_range.as_deref().unwrap_or("(none)")
    );

    println!("\nCrawl:");
    println!(
        "  Pages: {} to {}",
        config.crawl.start_page, config.crawl.max_page
    );
    println!("  Page interval: {}ms", config.crawl.page_interval_ms);
    println!("  Parser: {:?}", config.crawl.parser);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!(
        "  Timeouts: {}s (listing), {}s (detail)",
        config.http.timeout_secs, config.http.detail_timeout_secs
    );
    println!(
        "  Proxy: {}",
        if config.http.proxy_url.is_some() {
            "configured"
        } else {
            "none"
        }
    );
    println!(
        "  Retries: {} attempts, {}ms / {}ms delay",
        config.retry.attempts, config.retry.delay_ms, config.retry.detail_delay_ms
    );

    println!("\nOutput:");
    match config.output.sink {
        SinkKind::Csv => println!("  CSV file: {}", config.output.csv_path),
        SinkKind::Sqlite => println!("  SQLite database: {}", config.output.database_path),
        SinkKind::Bigquery => println!(
            "  BigQuery table: {}",
            config.warehouse.full_table_id().unwrap_or_default()
        ),
    }

    println!("\n✓ Configuration is valid");
}

fn log_report(report: &CrawlReport) {
    match &report.termination {
        Some(reason) => tracing::info!("Crawl complete: {}", reason),
        None => tracing::info!("Crawl complete"),
    }
    tracing::info!(
        "Pages fetched: {}, links seen: {}, records saved: {}",
        report.pages_fetched,
        report.links_seen,
        report.records_saved
    );

    for kind in [
        ErrorKind::Transport,
        ErrorKind::Parse,
        ErrorKind::Validation,
        ErrorKind::Sink,
    ] {
        let count = report.failures_of(kind);
        if count > 0 {
            tracing::warn!("{:?} failures: {}", kind, count);
        }
    }
}
