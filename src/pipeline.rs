//! Full scrape run sequencing
//!
//! A run clears the published snapshot, crawls every keyword, reconciles the
//! database with the fresh results, records the run and publishes a new
//! snapshot. Each step only starts once the previous one succeeded.

use crate::config::{compute_keywords_hash, load_keywords, Config};
use crate::crawler::{self, MatchedVideo};
use crate::matching::KeywordMatcher;
use crate::output::{clear_snapshot, export_snapshot};
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::{Result, ScraperError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    /// ID of the `success` run record
    pub run_id: i64,
    /// Run start (unix seconds); also the `scraped_at` of every written row
    pub started_at: i64,
    pub finished_at: i64,
    /// Number of matched videos written
    pub processed: usize,
    /// Number of stale rows removed by cleanup
    pub removed: usize,
    /// Number of entries in the exported snapshot
    pub exported: usize,
    /// Snapshot location
    pub output: PathBuf,
}

/// Current time as unix seconds
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Runs one complete scrape that started at `started_at`
///
/// # Steps
///
/// 1. Replace the snapshot with an empty array
/// 2. Load the keyword file (missing or empty is fatal)
/// 3. Crawl all keywords concurrently
/// 4. Remove stored videos from earlier runs that no longer match
/// 5. Upsert every crawled video, stamped with `started_at`
/// 6. Append a `success` run record
/// 7. Export the ranked snapshot
///
/// Steps 4 to 7 run on the blocking thread pool. Nothing is recorded on
/// failure; see [`run_and_record`].
pub async fn perform_scrape(config: &Config, started_at: i64) -> Result<ScrapeSummary> {
    clear_snapshot(&config.paths.output)?;

    let keywords = load_keywords(&config.paths.keywords)?;
    let fingerprint = compute_keywords_hash(&config.paths.keywords)?;
    tracing::info!(
        "Loaded {} keywords from {} (sha256 {})",
        keywords.len(),
        config.paths.keywords.display(),
        fingerprint
    );

    let matcher = Arc::new(KeywordMatcher::new(&keywords)?);
    let videos = crawler::crawl(config, Arc::clone(&matcher)).await?;

    let database = config.paths.database.clone();
    let output = config.paths.output.clone();
    tokio::task::spawn_blocking(move || {
        persist_results(&database, &output, &matcher, &videos, started_at)
    })
    .await
    .map_err(|e| ScraperError::Task(format!("persistence task failed: {}", e)))?
}

/// Reconciles the database with crawled videos, records the run and exports
///
/// This is the synchronous tail of [`perform_scrape`]: cleanup against
/// `started_at`, upsert, `success` run record, snapshot export.
pub fn persist_results(
    database: &Path,
    output: &Path,
    matcher: &KeywordMatcher,
    videos: &[MatchedVideo],
    started_at: i64,
) -> Result<ScrapeSummary> {
    let mut storage = SqliteStorage::new(database)?;
    let removed = storage.cleanup_unmatched(matcher, started_at)?;
    if removed > 0 {
        tracing::info!("Removed {} videos that no longer match any keyword", removed);
    }

    let processed = storage.upsert_videos(videos, started_at)?;
    let finished_at = now_timestamp();
    let run_id = storage.write_run(
        started_at,
        finished_at,
        RunStatus::Success,
        processed as u64,
        "",
    )?;

    let exported = export_snapshot(&storage, output)?;

    Ok(ScrapeSummary {
        run_id,
        started_at,
        finished_at,
        processed,
        removed,
        exported,
        output: output.to_path_buf(),
    })
}

/// Runs a scrape starting now and records a `failed` run if it errors
pub async fn run_and_record(config: &Config) -> Result<ScrapeSummary> {
    run_and_record_at(config, now_timestamp()).await
}

/// Runs [`perform_scrape`] and records a `failed` run if it errors
///
/// The same `started_at` stamps the written rows and either run record. The
/// failure record carries the error text and a processed count of 0. If
/// even that record cannot be written, the secondary error is logged and
/// the original error is returned.
pub async fn run_and_record_at(config: &Config, started_at: i64) -> Result<ScrapeSummary> {
    match perform_scrape(config, started_at).await {
        Ok(summary) => {
            tracing::info!(
                "Run {} finished: {} videos written, {} removed, {} exported to {}",
                summary.run_id,
                summary.processed,
                summary.removed,
                summary.exported,
                summary.output.display()
            );
            Ok(summary)
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            if let Err(record_err) = record_failure(config, started_at, &e) {
                tracing::error!("Failed to record failed run: {}", record_err);
            }
            Err(e)
        }
    }
}

fn record_failure(config: &Config, started_at: i64, error: &ScraperError) -> Result<i64> {
    let mut storage = SqliteStorage::new(&config.paths.database)?;
    let id = storage.write_run(
        started_at,
        now_timestamp().max(started_at),
        RunStatus::Failed,
        0,
        &error.to_string(),
    )?;
    Ok(id)
}
