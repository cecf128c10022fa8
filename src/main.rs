//! s3eker main entry point
//!
//! This is the command-line interface for the bucket discovery scraper.

use anyhow::Context;
use clap::Parser;
use s3eker::config::{load_config, validate, Config};
use s3eker::crawler::run_session;
use s3eker::output::{log_discoveries, observer_channel, print_summary};
use s3eker::storage::FlushOutcome;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// s3eker: open bucket discovery scraper
///
/// Polls a bucket listing page at a fixed rate, keeps every bucket above the
/// file-count threshold that is not already in the output file, and merges
/// the new ones into that file when interrupted (Ctrl-C).
#[derive(Parser, Debug)]
#[command(name = "s3eker")]
#[command(version = "1.0.0")]
#[command(about = "Open bucket discovery scraper", long_about = None)]
struct Cli {
    /// Output JSON file (loaded for deduplication, rewritten on exit)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<String>,

    /// Max concurrent workers
    #[arg(short = 'c', long = "concurrency")]
    concurrency: Option<u32>,

    /// Requests per second limit
    #[arg(short = 'r', long = "rate")]
    rate: Option<u32>,

    /// Source page URL to scrape
    #[arg(long = "url")]
    url: Option<String>,

    /// Minimum file count to accept a bucket
    #[arg(long = "min")]
    min: Option<u64>,

    /// Only keep buckets containing this text (repeatable)
    #[arg(long = "keyword", value_name = "TEXT")]
    keywords: Vec<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    timeout: Option<u64>,

    /// Optional TOML configuration file; flags override its values
    #[arg(long = "config", value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Log every newly discovered bucket
    #[arg(long)]
    watch: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let scraper = config.scraper;

    tracing::info!(
        "Polling {} with {} workers at {} requests/sec (min {} files)",
        scraper.source_url,
        scraper.concurrency,
        scraper.requests_per_second,
        scraper.min_file_count
    );

    let observer = if cli.watch {
        let (observer, receiver) = observer_channel(scraper.observer_capacity);
        tokio::spawn(log_discoveries(receiver));
        Some(observer)
    } else {
        None
    };

    let report = run_session(scraper, observer)
        .await
        .context("Scraping session failed to start")?;

    print_summary(&report);
    match &report.flush {
        Ok(FlushOutcome::Written { total, .. }) => {
            tracing::info!("Checkpoint now holds {} buckets", total)
        }
        Ok(FlushOutcome::Skipped) => {}
        Err(e) => eprintln!("Error creating output file: {}", e),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("s3eker=info,warn"),
            1 => EnvFilter::new("s3eker=debug,info"),
            2 => EnvFilter::new("s3eker=trace,debug"),
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

/// Loads the optional config file and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    let scraper = &mut config.scraper;
    if let Some(output) = &cli.output {
        scraper.output_path = output.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        scraper.concurrency = concurrency;
    }
    if let Some(rate) = cli.rate {
        scraper.requests_per_second = rate;
    }
    if let Some(url) = &cli.url {
        scraper.source_url = url.trim().to_string();
    }
    if let Some(min) = cli.min {
        scraper.min_file_count = min;
    }
    if !cli.keywords.is_empty() {
        scraper.keywords = cli.keywords.clone();
    }
    if let Some(timeout) = cli.timeout {
        scraper.request_timeout_secs = timeout;
    }

    validate(&config).context("Invalid options")?;
    Ok(config)
}
