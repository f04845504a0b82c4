//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::MatchedVideo;
use crate::matching::KeywordMatcher;
use crate::storage::{ClearedCounts, RunRecord, RunStatus, VideoRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines every database operation the scrape pipeline and its
/// query surface need. Nothing else reads or writes the tables.
pub trait Storage {
    // ===== Video Management =====

    /// Inserts a video or overwrites every mutable field of the existing row
    ///
    /// # Arguments
    ///
    /// * `video` - The matched video from the current crawl
    /// * `scraped_at` - Start time of the run writing this row (unix seconds)
    fn upsert_video(&mut self, video: &MatchedVideo, scraped_at: i64) -> StorageResult<()>;

    /// Upserts a batch of videos in a single transaction
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn upsert_videos(&mut self, videos: &[MatchedVideo], scraped_at: i64)
        -> StorageResult<usize>;

    /// Gets a video by its bvid
    fn get_video(&self, bvid: &str) -> StorageResult<Option<VideoRecord>>;

    /// Lists all videos, hottest first, then most recently scraped
    fn list_videos(&self) -> StorageResult<Vec<VideoRecord>>;

    /// Gets total video count
    fn count_videos(&self) -> StorageResult<u64>;

    /// Deletes stale videos that no longer match the keyword configuration
    ///
    /// Only rows with `scraped_at < current_scraped_at` are considered; rows
    /// written by the current run are never touched. Each candidate is
    /// re-matched from its stored title and metadata, without any network
    /// access.
    ///
    /// # Returns
    ///
    /// The number of rows removed
    fn cleanup_unmatched(
        &mut self,
        matcher: &KeywordMatcher,
        current_scraped_at: i64,
    ) -> StorageResult<usize>;

    // ===== Run Management =====

    /// Appends a run record
    ///
    /// # Returns
    ///
    /// The ID of the new run record
    fn write_run(
        &mut self,
        started_at: i64,
        finished_at: i64,
        status: RunStatus,
        processed_count: u64,
        errors: &str,
    ) -> StorageResult<i64>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets total run count
    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Maintenance =====

    /// Deletes every video and run and resets the run ID sequence
    fn clear_all(&mut self) -> StorageResult<ClearedCounts>;
}
