//! Search API client
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the browser-like default headers
//! - Issuing one search request per (keyword, page)
//! - Classifying responses into ready, retryable and rejected outcomes
//! - Retrying transient failures with capped exponential backoff

use crate::config::{Config, HttpConfig, ScraperConfig};
use crate::crawler::RateLimiter;
use crate::{ConfigError, ScraperError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Accept header sent with every search
pub const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

/// Non-retryable HTTP failure returned as data instead of an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// HTTP status code
    pub code: u16,
    /// Response body text
    pub text: String,
}

/// Final result of a search request
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    /// The parsed JSON envelope of a 200 response
    Envelope(Value),
    /// A 4xx (other than 429) or other non-200, non-5xx response
    Rejected(ErrorPayload),
}

/// Result of a single HTTP attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 200 with a JSON body
    Ready(Value),
    /// Transient failure worth another attempt
    Retryable(String),
    /// Permanent failure, never retried
    Rejected(ErrorPayload),
}

/// Exponential backoff schedule for retryable failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// Doubles from `initial_backoff` and never exceeds `max_backoff`.
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default())
    }
}

/// Builds an HTTP client with the search request identity
///
/// # Arguments
///
/// * `config` - User-Agent and Referer settings
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(ScraperError)` - A header value was invalid or the client failed to build
pub fn build_http_client(config: &HttpConfig, timeout: Duration) -> Result<Client, ScraperError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        REFERER,
        HeaderValue::from_str(&config.referer).map_err(|e| {
            ConfigError::Validation(format!("invalid referer header value: {}", e))
        })?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Rate-limited, retrying client for the video search endpoint
#[derive(Debug)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl SearchClient {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            limiter,
            retry,
        }
    }

    /// Builds a client from the loaded configuration
    ///
    /// The limiter is passed in so that every client of one run shares it.
    pub fn from_config(config: &Config, limiter: Arc<RateLimiter>) -> Result<Self, ScraperError> {
        let timeout = Duration::from_secs(config.scraper.request_timeout_secs.max(1));
        let client = build_http_client(&config.http, timeout)?;
        Ok(Self::new(
            client,
            config.http.search_url.clone(),
            limiter,
            RetryPolicy::from_config(&config.scraper),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches one page of video search results
    ///
    /// Each attempt first waits for a permit from the shared limiter.
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 with JSON | Return `Envelope` |
    /// | HTTP 5xx | Retry with backoff |
    /// | HTTP 429 | Retry with backoff |
    /// | Network error, timeout | Retry with backoff |
    /// | Undecodable 200 body | Retry with backoff |
    /// | Any other status | Return `Rejected`, no retry |
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResponse)` - Envelope or rejection payload
    /// * `Err(ScraperError::RetriesExhausted)` - Every attempt hit a retryable failure
    pub async fn search(
        &self,
        keyword: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchResponse, ScraperError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(keyword, page, page_size).await {
                AttemptOutcome::Ready(envelope) => return Ok(SearchResponse::Envelope(envelope)),
                AttemptOutcome::Rejected(payload) => return Ok(SearchResponse::Rejected(payload)),
                AttemptOutcome::Retryable(reason) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(ScraperError::RetriesExhausted {
                            keyword: keyword.to_string(),
                            page,
                            attempts: attempt,
                            reason,
                        });
                    }
                    let delay = self.retry.backoff_for(attempt);
                    tracing::debug!(
                        "Search '{}' page {} attempt {} failed ({}), retrying in {:?}",
                        keyword,
                        page,
                        attempt,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, keyword: &str, page: u32, page_size: u32) -> AttemptOutcome {
        self.limiter.acquire().await;

        let pn = page.to_string();
        let ps = page_size.to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("search_type", "video"),
            ("keyword", keyword),
            ("pn", pn.as_str()),
            ("ps", ps.as_str()),
            ("order", "pubdate"),
        ]);

        match request.send().await {
            Ok(response) => classify_response(response).await,
            Err(e) if e.is_timeout() => AttemptOutcome::Retryable("Request timeout".to_string()),
            Err(e) if e.is_connect() => AttemptOutcome::Retryable(format!("Connection failed: {}", e)),
            Err(e) => AttemptOutcome::Retryable(e.to_string()),
        }
    }
}

/// Maps an HTTP response onto an attempt outcome
async fn classify_response(response: Response) -> AttemptOutcome {
    let status = response.status();

    if status.as_u16() >= 500 {
        return AttemptOutcome::Retryable(format!("Server error: HTTP {}", status.as_u16()));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return AttemptOutcome::Retryable("Rate limited: HTTP 429".to_string());
    }

    if status != StatusCode::OK {
        let text = response.text().await.unwrap_or_default();
        return AttemptOutcome::Rejected(ErrorPayload {
            code: status.as_u16(),
            text,
        });
    }

    match response.json::<Value>().await {
        Ok(envelope) => AttemptOutcome::Ready(envelope),
        Err(e) => AttemptOutcome::Retryable(format!("Undecodable response body: {}", e)),
    }
}
