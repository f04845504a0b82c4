//! Text matching and count parsing
//!
//! This module contains the two pure building blocks of the scrape pipeline:
//! - Keyword matching over normalized titles and descriptions
//! - Parsing of the platform's human-formatted play/like counts

mod counts;
mod keywords;

pub use counts::{parse_count, parse_count_str};
pub use keywords::{normalize_text, KeywordMatcher};
