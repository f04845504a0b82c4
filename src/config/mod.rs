//! Configuration module for Bili-Sweep
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file, and loading the keyword list it points at.
//!
//! # Example
//!
//! ```no_run
//! use bili_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("bili-sweep.toml")).unwrap();
//! println!("Max pages per keyword: {}", config.scraper.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, HttpConfig, PathsConfig, ScraperConfig};

// Re-export parser functions
pub use parser::{compute_keywords_hash, load_config, load_keywords, parse_keywords};

pub use validation::validate;
