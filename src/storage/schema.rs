//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the Bili-Sweep database.

use rusqlite::Connection;

/// SQL schema for the database tables
pub const SCHEMA_SQL: &str = r#"
-- One row per video, overwritten by every run that finds it
CREATE TABLE IF NOT EXISTS videos (
    bvid TEXT PRIMARY KEY,
    title TEXT,
    pubdate INTEGER,
    url TEXT,
    metadata_json TEXT,
    scraped_at INTEGER,
    hot INTEGER DEFAULT 0
);

-- Append-only log of scrape runs
CREATE TABLE IF NOT EXISTS scrape_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at INTEGER,
    finished_at INTEGER,
    status TEXT,
    processed_count INTEGER,
    errors TEXT
);
"#;

/// Indexes, created after migrations so that every referenced column exists
pub const INDEX_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_videos_scraped_at ON videos(scraped_at);
CREATE INDEX IF NOT EXISTS idx_videos_ranking ON videos(hot DESC, scraped_at DESC);
"#;

/// Creates missing tables and upgrades older databases in place
///
/// Safe to call on every open: table creation is idempotent and each
/// migration checks for its target column first.
pub fn ensure_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Databases created before popularity ranking lack the `hot` column
    if !has_column(conn, "videos", "hot")? {
        tracing::info!("Migrating videos table: adding hot column");
        conn.execute("ALTER TABLE videos ADD COLUMN hot INTEGER DEFAULT 0", [])?;
    }

    conn.execute_batch(INDEX_SQL)?;
    Ok(())
}

/// Checks whether a table has a column with the given name
pub fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}
