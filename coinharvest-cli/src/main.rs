//! coinharvest CLI: collection, scrape and status commands.
//!
//! Commands:
//! - `collect`: detect the run mode and run every applicable phase
//! - `scrape`: run only the historical-page scrape
//! - `status`: report the run mode and output files without touching the network

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinharvest_core::data::{CoinGeckoClient, CoinMarketCapClient, QuoteApi};
use coinharvest_core::domain::{MarketRecord, OhlcRecord, QuoteRecord};
use coinharvest_core::scrape::{ChromeLauncher, DriverTimings, PageLauncher};
use coinharvest_core::storage::{CsvRow, CsvTable, RunStateMarker};
use coinharvest_core::detect;
use coinharvest_runner::{
    init_file_logging, Collector, CollectorConfig, Phase, RunReport, SkipReason, StdoutProgress,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "coinharvest",
    about = "coinharvest: crypto market data collector writing append-only CSV files"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./coinharvest.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory, overriding the config file.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full collection: backfill (first run only), snapshots and scrape.
    Collect {
        /// Skip the browser-based scrape phase.
        #[arg(long, default_value_t = false)]
        no_scrape: bool,
    },
    /// Scrape historical-data pages only.
    Scrape,
    /// Show the detected run mode and the state of the output files.
    Status,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let no_scrape = matches!(cli.command, Commands::Collect { no_scrape: true });
    let mut config = CollectorConfig::load(cli.config.as_deref())?;
    config.apply_env();
    config.apply_overrides(cli.output_dir, no_scrape);

    match cli.command {
        Commands::Collect { .. } => run_collect(&config),
        Commands::Scrape => run_scrape(&config),
        Commands::Status => run_status(&config),
    }
}

fn run_collect(config: &CollectorConfig) -> Result<()> {
    let catalog = config.validate()?;
    init_file_logging(&config.log_path(), &config.logging.level)?;
    tracing::info!(output = %config.output.dir.display(), "collection started");

    let market = CoinGeckoClient::new(
        config.coingecko.base_url.as_str(),
        config.coingecko.api_key.clone(),
        config.coingecko.timeout(),
    )
    .context("failed to build CoinGecko client")?;

    let quotes = match &config.coinmarketcap.api_key {
        Some(key) => Some(
            CoinMarketCapClient::new(
                config.coinmarketcap.base_url.as_str(),
                key.as_str(),
                config.coinmarketcap.timeout(),
            )
            .context("failed to build CoinMarketCap client")?,
        ),
        None => None,
    };

    let browser = browser_launcher(config);

    let progress = StdoutProgress;
    let collector = Collector::new(config, catalog, &progress);
    let report = collector.collect(
        &market,
        quotes.as_ref().map(|q| q as &dyn QuoteApi),
        browser.as_ref().map(|b| b as &dyn PageLauncher),
    )?;

    print_failures(&report);
    tracing::info!(
        records = report.total_records(),
        failures = report.total_failures(),
        "collection finished"
    );
    Ok(())
}

fn run_scrape(config: &CollectorConfig) -> Result<()> {
    let catalog = config.validate()?;
    init_file_logging(&config.log_path(), &config.logging.level)?;
    tracing::info!(output = %config.output.dir.display(), "scrape started");

    let browser = browser_launcher(config);
    let progress = StdoutProgress;
    let collector = Collector::new(config, catalog, &progress);
    let report = collector.scrape(browser.as_ref().map(|b| b as &dyn PageLauncher))?;

    print_failures(&report);
    Ok(())
}

/// Browser launcher for the scrape phase, or `None` when scraping is
/// disabled. The browser itself starts when that phase begins.
fn browser_launcher(config: &CollectorConfig) -> Option<ChromeLauncher> {
    config.scrape.enabled.then(|| {
        ChromeLauncher::new(DriverTimings {
            navigation_timeout: config.scrape.navigation_timeout(),
            settle_delay: config.scrape.settle_delay(),
        })
    })
}

fn print_failures(report: &RunReport) {
    if report
        .skipped
        .contains(&(Phase::ScrapeHistory, SkipReason::BrowserUnavailable))
    {
        eprintln!("Warning: browser unavailable; scrape phase was skipped");
    }
    for phase in &report.phases {
        for failure in &phase.failures {
            eprintln!("Error in {} for {}: {}", phase.phase, failure.item, failure.error);
        }
    }
}

fn run_status(config: &CollectorConfig) -> Result<()> {
    let paths = config.output_paths();
    let decision = detect(&paths);

    println!("Output directory: {}", paths.dir.display());
    println!("Next run: {} ({:?})", decision.mode, decision.basis);
    println!();
    println!("{:<32} {:>10}", "File", "Rows");
    println!("{}", "-".repeat(43));
    print_file_row::<MarketRecord>(&paths.market);
    print_file_row::<QuoteRecord>(&paths.quotes);
    print_file_row::<OhlcRecord>(&paths.ohlc);

    println!();
    match RunStateMarker::load(&paths.marker) {
        Ok(None) => println!("Run-state marker: none"),
        Err(e) => println!("Run-state marker: unreadable ({e})"),
        Ok(Some(marker)) => {
            let completed = marker
                .backfill_completed_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "-".into());
            println!(
                "Backfill: started={} completed={} at {completed}",
                marker.backfill_started, marker.backfill_completed
            );
            if !marker.backfill_completed && !marker.backfilled.is_empty() {
                println!(
                    "Backfilled so far: {} of {} tokens",
                    marker.backfilled.len(),
                    config.tokens.rest.len()
                );
            }
            if marker.tokens_changed(&config.tokens.rest) {
                println!("Token list changed since the backfill");
            }
            for (slug, through) in &marker.scraped_through {
                println!("  scraped {slug:<24} through {through}");
            }
        }
    }
    Ok(())
}

fn print_file_row<R: CsvRow>(path: &Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let table = CsvTable::<R>::new(path);
    let rows = if !table.exists() {
        "missing".to_string()
    } else {
        match table.row_count() {
            Ok(n) => n.to_string(),
            Err(e) => format!("error: {e}"),
        }
    };
    println!("{name:<32} {rows:>10}");
}
