//! Shared fixtures for the integration tests

use bili_sweep::config::{Config, HttpConfig};
use bili_sweep::crawler::{build_http_client, RateLimiter, RetryPolicy, SearchClient};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const SEARCH_PATH: &str = "/x/web-interface/search/type";

/// A raw search record as the endpoint returns it
pub fn search_item(bvid: &str, title: &str, play: i64) -> Value {
    json!({
        "type": "video",
        "bvid": bvid,
        "title": title,
        "description": "",
        "pubdate": 1_700_000_000,
        "play": play,
        "arcurl": format!("http://www.bilibili.com/video/{}", bvid),
    })
}

/// A search envelope wrapping the given items
pub fn page(items: Vec<Value>) -> Value {
    json!({ "code": 0, "message": "0", "data": { "result": items } })
}

pub fn empty_page() -> Value {
    page(Vec::new())
}

/// Retry policy with millisecond backoff so retries do not slow the tests
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

/// A search client pointed at the mock server
pub fn search_client(server_uri: &str, max_attempts: u32) -> SearchClient {
    search_client_with_timeout(server_uri, max_attempts, Duration::from_secs(5))
}

/// Like [`search_client`] but with a custom per-request timeout
pub fn search_client_with_timeout(
    server_uri: &str,
    max_attempts: u32,
    timeout: Duration,
) -> SearchClient {
    let client = build_http_client(&HttpConfig::default(), timeout).unwrap();
    SearchClient::new(
        client,
        format!("{}{}", server_uri, SEARCH_PATH),
        Arc::new(RateLimiter::per_second(50)),
        fast_retry(max_attempts),
    )
}

/// A full configuration whose files live in `dir` and whose searches hit the mock server
pub fn test_config(server_uri: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.scraper.rate_limit = 50;
    config.scraper.max_pages = 5;
    config.scraper.page_delay_ms = 0;
    config.scraper.request_timeout_secs = 5;
    config.scraper.max_attempts = 2;
    config.scraper.initial_backoff_ms = 1;
    config.scraper.max_backoff_ms = 5;
    config.http.search_url = format!("{}{}", server_uri, SEARCH_PATH);
    config.paths.keywords = dir.path().join("keywords.txt");
    config.paths.database = dir.path().join("data.sqlite");
    config.paths.output = dir.path().join("output").join("results.json");
    config.paths.lock = dir.path().join("run.lock");
    config
}
