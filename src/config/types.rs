use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Bili-Sweep
///
/// Every section is optional; missing sections fall back to the defaults
/// below, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Crawl pacing and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Search requests allowed per second across all keyword tasks
    #[serde(rename = "rate-limit")]
    pub rate_limit: u32,

    /// Results requested per search page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Maximum number of pages fetched per keyword
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Pause between consecutive pages of one keyword (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Total attempts per search request, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt (milliseconds)
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for the doubling backoff (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            rate_limit: 2,
            page_size: 20,
            max_pages: 50,
            page_delay_ms: 100,
            request_timeout_secs: 20,
            max_attempts: 4,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 8_000,
        }
    }
}

/// Search endpoint and request identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Full URL of the video search endpoint
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// User-Agent header sent with every search
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Referer header sent with every search
    pub referer: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            search_url: "https://api.bilibili.com/x/web-interface/search/type".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://www.bilibili.com".to_string(),
        }
    }
}

/// File locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Keyword list, one keyword per line
    pub keywords: PathBuf,

    /// SQLite database file
    pub database: PathBuf,

    /// Exported JSON snapshot
    pub output: PathBuf,

    /// Lock file guarding against overlapping runs
    pub lock: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            keywords: PathBuf::from("config/keywords.txt"),
            database: PathBuf::from("data.sqlite"),
            output: PathBuf::from("output/results.json"),
            lock: PathBuf::from("run.lock"),
        }
    }
}
