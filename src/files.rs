//! Finished-file handling: correlating downloads to results, building
//! the whole-task archive, and cleaning up task directories.

use crate::naming;
use crate::retry;
use crate::store::TaskResult;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Entry name of the archive served for a whole task
pub const ARCHIVE_NAME: &str = "playlist.zip";

#[derive(Debug, Error)]
pub enum FilesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Locate the downloaded file for an item inside a task directory.
///
/// Stored names start with the item id followed by the naming delimiter,
/// so a stem-prefix match identifies the file regardless of title
/// mangling or extension. First match wins.
pub fn find_item_file(dir: &Path, item_id: &str) -> std::io::Result<Option<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if naming::item_id_from_file_name(name) == Some(item_id) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Build an in-memory zip of every downloaded, non-errored result.
///
/// Entry names carry the padded playlist index so extraction preserves
/// order. Blocking; call from `spawn_blocking` in async contexts.
pub fn build_archive(results: &[TaskResult]) -> Result<Vec<u8>, FilesError> {
    let downloadable: Vec<&TaskResult> = results
        .iter()
        .filter(|r| r.was_downloaded && !r.has_error && r.path_to_file.is_some())
        .collect();
    let total = results.len();
    let is_playlist = total > 1;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for result in downloadable {
        // Filtered on path_to_file above.
        let Some(path) = result.path_to_file.as_deref() else {
            continue;
        };
        let path = Path::new(path);
        let Some(stored_name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(result_id = %result.id, "Skipping result with unusable file name");
            continue;
        };
        let entry_name =
            naming::serve_file_name(stored_name, result.index, total, is_playlist);

        let mut file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(err) => {
                warn!(result_id = %result.id, error = %err, "Skipping unreadable file");
                continue;
            }
        };
        writer.start_file(entry_name, options)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        writer.write_all(&buf)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Content type for a stored file, from its extension. The downloader
/// writes a closed set of containers, so a small table beats probing.
pub fn content_type_for(path: &Path) -> mime::Mime {
    let essence = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4" | "m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("flv") => "video/x-flv",
        Some("ogg") => "audio/ogg",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("flac") => "audio/flac",
        Some("opus") => "audio/opus",
        Some("wav") => "audio/wav",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };
    essence
        .parse()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// Delete a task's download directory, retrying while lingering file
/// handles keep it busy. A directory that is already gone counts as
/// success.
pub async fn remove_task_dir(dir: &Path, attempts: u32) -> Result<(), FilesError> {
    let dir = dir.to_path_buf();
    retry::with_backoff(attempts, "task_dir_cleanup", || {
        let dir = dir.clone();
        async move {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(dir = %dir.display(), "Task directory already removed");
                    Ok(())
                }
                Err(err) => Err(FilesError::Io(err)),
            }
        }
    })
    .await
}
