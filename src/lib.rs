//! Bili-Sweep: a keyword-driven video search scraper
//!
//! This crate searches a video platform for a curated keyword list, keeps the
//! results that actually mention one of the keywords, persists them in SQLite
//! with a per-run log, and exports a ranked JSON snapshot.

pub mod config;
pub mod crawler;
pub mod lock;
pub mod matching;
pub mod output;
pub mod pipeline;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Bili-Sweep operations
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search for '{keyword}' page {page} failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        keyword: String,
        page: u32,
        attempts: u32,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Keywords file not found: {}", .0.display())]
    KeywordsMissing(PathBuf),

    #[error("No keywords found in {}", .0.display())]
    KeywordsEmpty(PathBuf),

    #[error("Failed to build keyword matcher: {0}")]
    Matcher(String),
}

/// Result type alias for Bili-Sweep operations
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, MatchedVideo, RateLimiter, SearchClient};
pub use matching::{parse_count, KeywordMatcher};
pub use pipeline::{perform_scrape, run_and_record, run_and_record_at, ScrapeSummary};
pub use storage::{RunRecord, RunStatus, SqliteStorage, Storage, VideoRecord};
