//! Crawl coordination across keywords
//!
//! This module drives the search crawl, including:
//! - Paginating one keyword until the results run out or the page cap is hit
//! - Extracting, matching and deduplicating the items of each page
//! - Running every keyword concurrently and merging the results

use crate::config::ScraperConfig;
use crate::crawler::fetcher::{SearchClient, SearchResponse};
use crate::crawler::parser::{description_of, extract_item, result_items, MatchedVideo};
use crate::matching::KeywordMatcher;
use crate::ScraperError;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Keyword crawler
///
/// Cheap to clone: the search client and matcher are shared, so one clone is
/// handed to each concurrent keyword task.
#[derive(Debug, Clone)]
pub struct Crawler {
    client: Arc<SearchClient>,
    matcher: Arc<KeywordMatcher>,
    max_pages: u32,
    page_size: u32,
    page_delay: Duration,
}

impl Crawler {
    /// Creates a crawler using the pagination settings of `config`
    pub fn new(
        client: Arc<SearchClient>,
        matcher: Arc<KeywordMatcher>,
        config: &ScraperConfig,
    ) -> Self {
        Self {
            client,
            matcher,
            max_pages: config.max_pages,
            page_size: config.page_size,
            page_delay: Duration::from_millis(config.page_delay_ms),
        }
    }

    /// Crawls every result page of one keyword
    ///
    /// Pagination stops at the first page without results, at the first
    /// rejected response, when retries for a page are exhausted, or after
    /// `max_pages` pages. The last two cases are logged and end this keyword
    /// only; the matches collected so far are kept.
    ///
    /// Items without a pubdate or bvid are skipped, a bvid seen earlier in
    /// this keyword's crawl is skipped, and items whose normalized title and
    /// description match no configured keyword are dropped.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<MatchedVideo>)` - Matches in page order
    /// * `Err(ScraperError)` - Keyword matching could not be run
    pub async fn crawl_keyword(&self, keyword: &str) -> Result<Vec<MatchedVideo>, ScraperError> {
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=self.max_pages {
            let envelope = match self.client.search(keyword, page, self.page_size).await {
                Ok(SearchResponse::Envelope(envelope)) => envelope,
                Ok(SearchResponse::Rejected(payload)) => {
                    tracing::warn!(
                        "Search for '{}' page {} rejected with HTTP {}: {}",
                        keyword,
                        page,
                        payload.code,
                        truncate(&payload.text, 200)
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    break;
                }
            };

            let Some(items) = result_items(&envelope) else {
                tracing::debug!("No more results for '{}' after page {}", keyword, page - 1);
                break;
            };

            let before = results.len();
            for raw in items {
                let item = extract_item(raw);
                if item.pubdate.is_none() {
                    continue;
                }
                let Some(bvid) = item.bvid.clone() else {
                    continue;
                };
                if !seen.insert(bvid) {
                    continue;
                }

                let matches = self.match_item(&item.title, raw).await?;
                if let Some(video) = MatchedVideo::from_extracted(item, raw, matches) {
                    results.push(video);
                }
            }

            tracing::debug!(
                "Keyword '{}' page {}: {} items, {} matched",
                keyword,
                page,
                items.len(),
                results.len() - before
            );

            if page < self.max_pages && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        tracing::info!("Keyword '{}' produced {} matches", keyword, results.len());
        Ok(results)
    }

    /// Crawls all keywords concurrently and merges the results
    ///
    /// Keyword tasks run in parallel, bounded only by the shared rate
    /// limiter. Results are merged in task completion order and deduplicated
    /// by bvid: the first completed keyword to report a video wins, and its
    /// record (match set included) is kept unchanged.
    pub async fn crawl_all(&self, keywords: &[String]) -> Result<Vec<MatchedVideo>, ScraperError> {
        let mut tasks = JoinSet::new();
        for keyword in keywords {
            let crawler = self.clone();
            let keyword = keyword.clone();
            tasks.spawn(async move { crawler.crawl_keyword(&keyword).await });
        }

        let mut completed = Vec::with_capacity(keywords.len());
        while let Some(joined) = tasks.join_next().await {
            let videos = joined
                .map_err(|e| ScraperError::Task(format!("keyword task failed: {}", e)))??;
            completed.push(videos);
        }

        let merged = merge_results(completed);
        tracing::info!(
            "Crawled {} keywords, {} unique videos",
            keywords.len(),
            merged.len()
        );
        Ok(merged)
    }

    /// Matches keywords against the title and, if present, the description
    async fn match_item(&self, title: &str, raw: &Value) -> Result<BTreeSet<String>, ScraperError> {
        let mut matches = self.matcher.match_text_async(title.to_string()).await?;
        if let Some(description) = description_of(raw) {
            matches.extend(
                self.matcher
                    .match_text_async(description.to_string())
                    .await?,
            );
        }
        Ok(matches)
    }
}

/// Concatenates per-keyword result lists, keeping the first record per bvid
pub fn merge_results<I>(lists: I) -> Vec<MatchedVideo>
where
    I: IntoIterator<Item = Vec<MatchedVideo>>,
{
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|video| seen.insert(video.bvid.clone()))
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
