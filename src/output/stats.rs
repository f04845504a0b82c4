//! Statistics from the scrape database
//!
//! This module provides functionality for extracting and displaying
//! a short status report: the last run, the stored videos and the snapshot.

use crate::output::snapshot::read_snapshot;
use crate::storage::{RunRecord, RunStatus, Storage};
use crate::ScraperError;
use std::path::Path;

/// Scrape statistics summary
#[derive(Debug, Clone)]
pub struct ScrapeStatistics {
    /// Most recent run, if any run was recorded
    pub last_run: Option<RunRecord>,

    /// Total number of recorded runs
    pub total_runs: u64,

    /// Number of videos currently stored
    pub stored_videos: u64,

    /// Number of entries in the exported snapshot
    pub snapshot_entries: usize,
}

/// Loads statistics from storage and the snapshot file
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `snapshot` - Path of the exported snapshot
///
/// # Returns
///
/// * `Ok(ScrapeStatistics)` - Successfully loaded statistics
/// * `Err(ScraperError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    snapshot: &Path,
) -> Result<ScrapeStatistics, ScraperError> {
    Ok(ScrapeStatistics {
        last_run: storage.latest_run()?,
        total_runs: storage.count_runs()?,
        stored_videos: storage.count_videos()?,
        snapshot_entries: read_snapshot(snapshot)?.len(),
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ScrapeStatistics) {
    println!("=== Scrape Statistics ===\n");

    println!("Overview:");
    println!("  Recorded runs: {}", stats.total_runs);
    println!("  Stored videos: {}", stats.stored_videos);
    println!("  Snapshot entries: {}", stats.snapshot_entries);
    println!();

    match &stats.last_run {
        Some(run) => {
            println!("Last Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", format_timestamp(run.started_at));
            println!("  Finished: {}", format_timestamp(run.finished_at));
            println!(
                "  Duration: {}s",
                (run.finished_at - run.started_at).max(0)
            );
            println!("  Videos processed: {}", run.processed_count);
            if run.status == RunStatus::Failed && !run.errors.is_empty() {
                println!("  Error: {}", run.errors);
            }
        }
        None => println!("No runs recorded yet"),
    }
}

/// Formats unix seconds as an RFC 3339 UTC timestamp
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}
