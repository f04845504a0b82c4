//! Bili-Sweep main entry point
//!
//! This is the command-line interface for the Bili-Sweep keyword scraper.

use anyhow::Context;
use bili_sweep::config::{compute_keywords_hash, load_config, load_keywords, validate, Config};
use bili_sweep::lock::{is_run_in_progress, RunLock};
use bili_sweep::output::{clear_snapshot, load_statistics, print_statistics, read_snapshot};
use bili_sweep::output::stats::format_timestamp;
use bili_sweep::storage::{SqliteStorage, Storage};
use bili_sweep::{run_and_record, KeywordMatcher};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// The run failed; a `failed` run record was written when possible
const EXIT_RUN_FAILED: u8 = 2;

/// Another run holds the lock
const EXIT_ALREADY_RUNNING: u8 = 4;

/// Bili-Sweep: a keyword-driven video search scraper
///
/// Bili-Sweep searches for every keyword in the keyword file, keeps the
/// videos whose title or description actually mention a keyword, stores
/// them in SQLite and exports a ranked JSON snapshot.
#[derive(Parser, Debug)]
#[command(name = "bili-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A keyword-driven video search scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the keyword file path
    #[arg(long, value_name = "PATH")]
    keywords: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Override the JSON snapshot path
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Validate config and keywords without scraping
    #[arg(long, group = "mode")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, group = "mode")]
    stats: bool,

    /// Report whether a run is in progress and exit
    #[arg(long, group = "mode")]
    status: bool,

    /// Create or migrate the database schema and exit
    #[arg(long, group = "mode")]
    init_db: bool,

    /// Delete all stored videos and runs and exit
    #[arg(long, group = "mode")]
    clear_db: bool,

    /// Reset the JSON snapshot to an empty array and exit
    #[arg(long, group = "mode")]
    clear_results: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load_effective_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return ExitCode::from(EXIT_RUN_FAILED);
        }
    };

    // Handle different modes
    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.status {
        handle_status(&config)
    } else if cli.init_db {
        handle_init_db(&config)
    } else if cli.clear_db {
        handle_clear_db(&config)
    } else if cli.clear_results {
        handle_clear_results(&config)
    } else {
        return handle_scrape(&config).await;
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_RUN_FAILED)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bili_sweep=info,warn"),
            1 => EnvFilter::new("bili_sweep=debug,info"),
            2 => EnvFilter::new("bili_sweep=trace,debug"),
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

/// Loads the config file (or defaults) and applies command-line path overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("cannot use config file {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(path) = &cli.keywords {
        config.paths.keywords = path.clone();
    }
    if let Some(path) = &cli.db {
        config.paths.database = path.clone();
    }
    if let Some(path) = &cli.out {
        config.paths.output = path.clone();
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the default mode: one locked scrape run
async fn handle_scrape(config: &Config) -> ExitCode {
    let _lock = match RunLock::acquire(&config.paths.lock) {
        Ok(Some(lock)) => lock,
        Ok(None) => {
            tracing::warn!(
                "Another run is in progress (lock file {})",
                config.paths.lock.display()
            );
            return ExitCode::from(EXIT_ALREADY_RUNNING);
        }
        Err(e) => {
            tracing::error!(
                "Failed to lock {}: {}",
                config.paths.lock.display(),
                e
            );
            return ExitCode::from(EXIT_RUN_FAILED);
        }
    };

    tracing::info!(
        "Starting scrape: keywords {}, database {}",
        config.paths.keywords.display(),
        config.paths.database.display()
    );

    match run_and_record(config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(EXIT_RUN_FAILED),
    }
}

/// Handles the --dry-run mode: validates config and keywords
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Bili-Sweep Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Rate limit: {} req/s", config.scraper.rate_limit);
    println!("  Page size: {}", config.scraper.page_size);
    println!("  Max pages per keyword: {}", config.scraper.max_pages);
    println!("  Page delay: {}ms", config.scraper.page_delay_ms);
    println!(
        "  Request timeout: {}s, {} attempts",
        config.scraper.request_timeout_secs, config.scraper.max_attempts
    );

    println!("\nHTTP:");
    println!("  Search URL: {}", config.http.search_url);
    println!("  Referer: {}", config.http.referer);

    println!("\nPaths:");
    println!("  Keywords: {}", config.paths.keywords.display());
    println!("  Database: {}", config.paths.database.display());
    println!("  Output: {}", config.paths.output.display());
    println!("  Lock: {}", config.paths.lock.display());

    let keywords = load_keywords(&config.paths.keywords)?;
    let matcher = KeywordMatcher::new(&keywords)?;
    let fingerprint = compute_keywords_hash(&config.paths.keywords)?;

    println!("\nKeywords ({}):", matcher.keywords().len());
    for keyword in matcher.keywords() {
        println!("  - {}", keyword);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Keyword set sha256: {}", fingerprint);
    println!(
        "✓ Would issue at most {} search requests",
        matcher.keywords().len() as u64 * u64::from(config.scraper.max_pages)
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.paths.database.display());

    let storage = SqliteStorage::new(&config.paths.database)?;
    let stats = load_statistics(&storage, &config.paths.output)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --status mode: reports the lock and the last run
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let running = is_run_in_progress(&config.paths.lock);
    println!("Running: {}", if running { "yes" } else { "no" });

    if config.paths.database.exists() {
        let storage = SqliteStorage::new(&config.paths.database)?;
        if let Some(run) = storage.latest_run()? {
            println!(
                "Last run: #{} {} at {} ({} videos)",
                run.id,
                run.status.to_db_string(),
                format_timestamp(run.finished_at),
                run.processed_count
            );
        }
    }

    let entries = read_snapshot(&config.paths.output)?.len();
    println!("Snapshot: {} entries", entries);

    Ok(())
}

/// Handles the --init-db mode: creates or migrates the schema
fn handle_init_db(config: &Config) -> anyhow::Result<()> {
    SqliteStorage::new(&config.paths.database)?;
    println!("✓ Database ready: {}", config.paths.database.display());
    Ok(())
}

/// Handles the --clear-db mode: deletes every stored row
fn handle_clear_db(config: &Config) -> anyhow::Result<()> {
    let mut storage = SqliteStorage::new(&config.paths.database)?;
    let cleared = storage.clear_all()?;
    println!(
        "✓ Deleted {} videos and {} runs from {}",
        cleared.videos_deleted,
        cleared.runs_deleted,
        config.paths.database.display()
    );
    Ok(())
}

/// Handles the --clear-results mode: resets the snapshot
fn handle_clear_results(config: &Config) -> anyhow::Result<()> {
    clear_snapshot(&config.paths.output)?;
    println!("✓ Cleared {}", config.paths.output.display());
    Ok(())
}
