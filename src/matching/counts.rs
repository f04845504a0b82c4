//! Play and like count parsing
//!
//! Search results report counts either as plain numbers or as display
//! strings such as `"1.2万"`, `"3.4亿"`, `"12,345"` or `"5000+"`. Parsing never
//! fails: anything unreadable counts as zero.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

/// Multiplier for the 万 unit
const TEN_THOUSAND: f64 = 10_000.0;

/// Multiplier for the 亿 unit
const HUNDRED_MILLION: f64 = 100_000_000.0;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("number pattern is valid"));

/// Parses a count field from a raw search record
///
/// # Examples
///
/// ```
/// use bili_sweep::parse_count;
/// use serde_json::json;
///
/// assert_eq!(parse_count(Some(&json!("1.2万"))), 12000);
/// assert_eq!(parse_count(Some(&json!(42.9))), 42);
/// assert_eq!(parse_count(None), 0);
/// ```
pub fn parse_count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => number_to_count(n),
        Some(Value::String(s)) => parse_count_str(s),
        _ => 0,
    }
}

/// Parses a display-formatted count string
pub fn parse_count_str(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    let without_separators = trimmed.replace(',', "");
    let cleaned = without_separators.trim_end_matches('+');

    if cleaned.contains('亿') {
        return scaled_first_number(cleaned, HUNDRED_MILLION);
    }
    if cleaned.contains('万') {
        return scaled_first_number(cleaned, TEN_THOUSAND);
    }

    match cleaned.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => first_number(cleaned).map_or(0, truncate),
    }
}

fn number_to_count(n: &Number) -> i64 {
    if let Some(i) = n.as_i64() {
        i
    } else if let Some(u) = n.as_u64() {
        i64::try_from(u).unwrap_or(i64::MAX)
    } else {
        n.as_f64().map_or(0, truncate)
    }
}

fn scaled_first_number(s: &str, unit: f64) -> i64 {
    first_number(s).map_or(0, |value| truncate(value * unit))
}

fn first_number(s: &str) -> Option<f64> {
    NUMBER_RE
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

// `as` saturates on overflow
fn truncate(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}
