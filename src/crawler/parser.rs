//! Search envelope parser for extracting candidate videos
//!
//! This module handles reading the platform's JSON search envelope:
//! - Locating the result list of a page
//! - Extracting bvid, title, pubdate, URL and hotness from each raw record
//! - Picking the description text used for keyword matching

use crate::matching::parse_count;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Canonical watch-page URL prefix for a bvid
pub const VIDEO_URL_PREFIX: &str = "https://www.bilibili.com/video/";

/// Fields pulled out of one raw search record
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedItem {
    pub bvid: Option<String>,
    pub title: String,
    pub pubdate: Option<i64>,
    pub url: Option<String>,
    pub hot: i64,
}

/// A search result that matched at least one configured keyword
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedVideo {
    pub bvid: String,
    pub title: String,
    pub pubdate: i64,
    pub url: String,
    /// Matched keywords, sorted
    pub matches: Vec<String>,
    /// `{"raw": <original search record>}`
    pub metadata: Value,
    pub hot: i64,
}

impl MatchedVideo {
    /// Builds a matched video from an extracted item and its keyword hits
    ///
    /// Returns `None` when the item lacks a bvid or a pubdate, or when the
    /// match set is empty.
    pub fn from_extracted(
        item: ExtractedItem,
        raw: &Value,
        matches: BTreeSet<String>,
    ) -> Option<Self> {
        if matches.is_empty() {
            return None;
        }
        let bvid = item.bvid?;
        let pubdate = item.pubdate?;
        let url = item
            .url
            .unwrap_or_else(|| format!("{}{}", VIDEO_URL_PREFIX, bvid));

        Some(Self {
            bvid,
            title: item.title,
            pubdate,
            url,
            matches: matches.into_iter().collect(),
            metadata: json!({ "raw": raw }),
            hot: item.hot,
        })
    }
}

/// Returns the non-empty result list of a search envelope
///
/// `None` means the page carries nothing to process: no `data` object, or
/// neither `data.result` nor `data.vlist` holds a non-empty list.
pub fn result_items(envelope: &Value) -> Option<&[Value]> {
    let data = envelope.get("data").filter(|d| d.is_object())?;

    ["result", "vlist"]
        .iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_array))
        .find(|list| !list.is_empty())
        .map(Vec::as_slice)
}

/// Extracts candidate fields from a raw search record
pub fn extract_item(raw: &Value) -> ExtractedItem {
    let bvid = raw
        .get("bvid")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let url = match &bvid {
        Some(bvid) => Some(format!("{}{}", VIDEO_URL_PREFIX, bvid)),
        None => raw
            .get("arcurl")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    ExtractedItem {
        bvid,
        title,
        pubdate: raw.get("pubdate").and_then(as_timestamp),
        url,
        hot: hotness(raw),
    }
}

/// Picks the description text of a raw record, if any
pub fn description_of(raw: &Value) -> Option<&str> {
    ["description", "desc"]
        .iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Play count, falling back to like count; never negative
fn hotness(raw: &Value) -> i64 {
    let stat = raw.get("stat");
    let play = present(raw.get("play"))
        .or_else(|| present(raw.get("playcount")))
        .or_else(|| present(stat.and_then(|s| s.get("view"))))
        .or_else(|| present(stat.and_then(|s| s.get("play"))));

    let mut hot = parse_count(play);
    if hot == 0 {
        hot = parse_count(present(raw.get("like")));
    }
    hot.max(0)
}

/// Filters out null, zero, false and empty values
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}

fn as_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
