//! Crawler module for keyword video search
//!
//! This module contains the core crawling logic, including:
//! - Search requests with retry logic
//! - Search envelope parsing and item extraction
//! - Shared request rate limiting
//! - Per-keyword pagination and cross-keyword merging

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{merge_results, Crawler};
pub use fetcher::{
    build_http_client, AttemptOutcome, ErrorPayload, RetryPolicy, SearchClient, SearchResponse,
    ACCEPT_JSON,
};
pub use parser::{
    description_of, extract_item, result_items, ExtractedItem, MatchedVideo, VIDEO_URL_PREFIX,
};
pub use scheduler::RateLimiter;

use crate::config::Config;
use crate::matching::KeywordMatcher;
use crate::ScraperError;
use std::sync::Arc;

/// Crawls every keyword of `matcher` with clients built from `config`
///
/// One rate limiter is created here and shared by all keyword tasks.
///
/// # Returns
///
/// * `Ok(Vec<MatchedVideo>)` - Merged, deduplicated matches
/// * `Err(ScraperError)` - Client setup or a keyword task failed
pub async fn crawl(
    config: &Config,
    matcher: Arc<KeywordMatcher>,
) -> Result<Vec<MatchedVideo>, ScraperError> {
    let limiter = Arc::new(RateLimiter::per_second(config.scraper.rate_limit));
    let client = Arc::new(SearchClient::from_config(config, limiter)?);
    let keywords = matcher.keywords().to_vec();

    let crawler = Crawler::new(client, matcher, &config.scraper);
    crawler.crawl_all(&keywords).await
}
