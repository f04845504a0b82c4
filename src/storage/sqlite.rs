//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{description_of, MatchedVideo};
use crate::matching::KeywordMatcher;
use crate::storage::schema::ensure_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{ClearedCounts, RunRecord, RunStatus, VideoRecord};
use crate::ScraperError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;

const VIDEO_COLUMNS: &str =
    "bvid, title, pubdate, url, metadata_json, scraped_at, COALESCE(hot, 0)";

const RUN_COLUMNS: &str = "id, started_at, finished_at, status, processed_count, errors";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database and makes sure the schema is current
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - A schema-ready store
    /// * `Err(ScraperError)` - Failed to open or migrate the database
    pub fn new(path: &Path) -> Result<Self, ScraperError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        ensure_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, ScraperError> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn upsert_row(conn: &Connection, video: &MatchedVideo, scraped_at: i64) -> StorageResult<()> {
    let metadata_json = serde_json::to_string(&video.metadata)?;
    conn.execute(
        "INSERT INTO videos (bvid, title, pubdate, url, metadata_json, scraped_at, hot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(bvid) DO UPDATE SET
             title = excluded.title,
             pubdate = excluded.pubdate,
             url = excluded.url,
             metadata_json = excluded.metadata_json,
             scraped_at = excluded.scraped_at,
             hot = excluded.hot",
        params![
            video.bvid,
            video.title,
            video.pubdate,
            video.url,
            metadata_json,
            scraped_at,
            video.hot.max(0),
        ],
    )?;
    Ok(())
}

/// Malformed or missing metadata reads back as an empty object
fn parse_metadata(metadata_json: Option<String>) -> Value {
    metadata_json
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_else(|| Value::Object(Default::default()))
}

fn video_from_row(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        bvid: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        pubdate: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
        url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        metadata: parse_metadata(row.get(4)?),
        scraped_at: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        hot: row.get(6)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
        finished_at: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
        status: row
            .get::<_, Option<String>>(3)?
            .as_deref()
            .and_then(RunStatus::from_db_string)
            .unwrap_or(RunStatus::Failed),
        processed_count: row.get::<_, Option<i64>>(4)?.unwrap_or(0).max(0) as u64,
        errors: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

impl Storage for SqliteStorage {
    // ===== Video Management =====

    fn upsert_video(&mut self, video: &MatchedVideo, scraped_at: i64) -> StorageResult<()> {
        upsert_row(&self.conn, video, scraped_at)
    }

    fn upsert_videos(
        &mut self,
        videos: &[MatchedVideo],
        scraped_at: i64,
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        for video in videos {
            upsert_row(&tx, video, scraped_at)?;
        }
        tx.commit()?;
        Ok(videos.len())
    }

    fn get_video(&self, bvid: &str) -> StorageResult<Option<VideoRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM videos WHERE bvid = ?1", VIDEO_COLUMNS))?;

        let video = stmt.query_row(params![bvid], video_from_row).optional()?;

        Ok(video)
    }

    fn list_videos(&self) -> StorageResult<Vec<VideoRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM videos ORDER BY COALESCE(hot, 0) DESC, scraped_at DESC",
            VIDEO_COLUMNS
        ))?;

        let videos = stmt
            .query_map([], video_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(videos)
    }

    fn count_videos(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn cleanup_unmatched(
        &mut self,
        matcher: &KeywordMatcher,
        current_scraped_at: i64,
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;

        let stale: Vec<(String, Option<String>, Option<String>)> = {
            let mut stmt = tx.prepare(
                "SELECT bvid, title, metadata_json FROM videos WHERE scraped_at < ?1",
            )?;
            let rows = stmt
                .query_map(params![current_scraped_at], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut removed = 0;
        for (bvid, title, metadata_json) in stale {
            let metadata = parse_metadata(metadata_json);
            let raw = metadata.get("raw").unwrap_or(&Value::Null);

            let mut matches = matcher.match_text(title.as_deref().unwrap_or_default());
            if let Some(desc) = description_of(raw) {
                matches.extend(matcher.match_text(desc));
            }

            if matches.is_empty() {
                tracing::debug!("Removing {} (no longer matches any keyword)", bvid);
                tx.execute("DELETE FROM videos WHERE bvid = ?1", params![bvid])?;
                removed += 1;
            }
        }

        tx.commit()?;
        Ok(removed)
    }

    // ===== Run Management =====

    fn write_run(
        &mut self,
        started_at: i64,
        finished_at: i64,
        status: RunStatus,
        processed_count: u64,
        errors: &str,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO scrape_runs (started_at, finished_at, status, processed_count, errors)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                started_at,
                finished_at,
                status.to_db_string(),
                processed_count as i64,
                errors
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM scrape_runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], run_from_row).optional()?;

        Ok(run)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scrape_runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Maintenance =====

    fn clear_all(&mut self) -> StorageResult<ClearedCounts> {
        let tx = self.conn.transaction()?;
        let videos_deleted = tx.execute("DELETE FROM videos", [])?;
        let runs_deleted = tx.execute("DELETE FROM scrape_runs", [])?;
        tx.execute(
            "DELETE FROM sqlite_sequence WHERE name IN ('videos', 'scrape_runs')",
            [],
        )?;
        tx.commit()?;

        Ok(ClearedCounts {
            videos_deleted,
            runs_deleted,
        })
    }
}
