//! Output module for snapshots and status reports
//!
//! This module handles:
//! - Exporting the ranked JSON snapshot of stored videos
//! - Clearing and reading back the snapshot
//! - Loading and printing scrape statistics

mod snapshot;
pub mod stats;

pub use snapshot::{clear_snapshot, export_snapshot, read_snapshot};
pub use stats::{load_statistics, print_statistics, ScrapeStatistics};
