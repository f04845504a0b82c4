//! JSON snapshot of the stored videos
//!
//! The snapshot is a pretty-printed JSON array of every stored video, ranked
//! the same way as [`Storage::list_videos`]. It is rewritten in full on each
//! successful run and cleared at the start of every run.

use crate::storage::{Storage, VideoRecord};
use crate::ScraperError;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes every stored video to `path` as a JSON array
///
/// The array is written to a sibling temporary file first and then renamed
/// over the target, so readers never see a half-written snapshot.
///
/// # Returns
///
/// * `Ok(usize)` - Number of videos exported
/// * `Err(ScraperError)` - Query, serialization or file write failed
pub fn export_snapshot(storage: &dyn Storage, path: &Path) -> Result<usize, ScraperError> {
    let videos = storage.list_videos()?;
    let json = serde_json::to_string_pretty(&videos)?;
    write_atomically(path, json.as_bytes())?;

    tracing::info!("Exported {} videos to {}", videos.len(), path.display());
    Ok(videos.len())
}

/// Replaces the snapshot with an empty array
pub fn clear_snapshot(path: &Path) -> Result<(), ScraperError> {
    write_atomically(path, b"[]")?;
    tracing::debug!("Cleared snapshot {}", path.display());
    Ok(())
}

/// Reads the current snapshot
///
/// A missing file reads as an empty list.
pub fn read_snapshot(path: &Path) -> Result<Vec<VideoRecord>, ScraperError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}
