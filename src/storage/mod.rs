//! Storage module for persisting scrape results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema migration
//! - Video upserts and stale-video cleanup
//! - Run record bookkeeping
//! - Ordered listing for snapshot export

mod schema;
mod sqlite;
mod traits;

pub use schema::ensure_schema;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use serde::{Deserialize, Serialize};

/// Represents a stored video
///
/// Field order matches the exported snapshot objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub bvid: String,
    pub title: String,
    pub pubdate: i64,
    pub url: String,
    pub metadata: serde_json::Value,
    pub scraped_at: i64,
    pub hot: i64,
}

/// Represents a scrape run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: i64,
    pub status: RunStatus,
    pub processed_count: u64,
    pub errors: String,
}

/// Outcome of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Row counts removed by [`Storage::clear_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearedCounts {
    pub videos_deleted: usize,
    pub runs_deleted: usize,
}
