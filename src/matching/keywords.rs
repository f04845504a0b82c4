//! Keyword matching over search result text
//!
//! Titles returned by the search endpoint carry highlight markup
//! (`<em class="keyword">...</em>`) and HTML entities, so text is normalized
//! before it is scanned. All keywords are searched in a single pass with an
//! Aho-Corasick automaton built once per run.

use crate::{ConfigError, ScraperError};
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("tag pattern is valid"));

/// Decodes HTML entities, then removes `<...>` markup spans
///
/// Entities are decoded first, so escaped markup such as `&lt;b&gt;` is
/// removed as well.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let decoded = html_escape::decode_html_entities(text);
    TAG_RE.replace_all(&decoded, "").into_owned()
}

/// Multi-keyword substring matcher
///
/// Matching is exact and case-sensitive: no tokenization, no stemming, and
/// overlapping occurrences all count.
#[derive(Debug)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    automaton: AhoCorasick,
}

impl KeywordMatcher {
    /// Builds a matcher from an ordered keyword list
    ///
    /// Entries are trimmed; blank entries and repeats are dropped. An empty
    /// resulting list is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use bili_sweep::KeywordMatcher;
    ///
    /// let matcher = KeywordMatcher::new(["foo", "bar"]).unwrap();
    /// let matches = matcher.match_text("<b>foo</b> and BAZ");
    /// assert!(matches.contains("foo"));
    /// assert!(!matches.contains("bar"));
    /// ```
    pub fn new<I, S>(keywords: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();

        if keywords.is_empty() {
            return Err(ConfigError::Validation(
                "keyword matcher needs at least one keyword".to_string(),
            ));
        }

        let automaton =
            AhoCorasick::new(&keywords).map_err(|e| ConfigError::Matcher(e.to_string()))?;

        Ok(Self {
            keywords,
            automaton,
        })
    }

    /// The configured keywords, in configuration order
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns every configured keyword found in the normalized text
    pub fn match_text(&self, text: &str) -> BTreeSet<String> {
        let normalized = normalize_text(text);
        self.automaton
            .find_overlapping_iter(&normalized)
            .map(|m| self.keywords[m.pattern().as_usize()].clone())
            .collect()
    }

    /// Runs [`match_text`](Self::match_text) on the blocking thread pool
    pub async fn match_text_async(
        self: &Arc<Self>,
        text: String,
    ) -> Result<BTreeSet<String>, ScraperError> {
        let matcher = Arc::clone(self);
        tokio::task::spawn_blocking(move || matcher.match_text(&text))
            .await
            .map_err(|e| ScraperError::Task(format!("keyword matching failed: {}", e)))
    }
}
