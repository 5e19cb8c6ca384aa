//! Download directory layout and output-file naming
//!
//! Files land under `{download_root}/{owner}/{task_id}/`. The output
//! template embeds the source item id ahead of a delimiter so finished
//! files can be correlated back to their result record by stem prefix,
//! regardless of how the title was mangled.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Separator between the item id and the title in stored file names.
/// Unusual on purpose, so it never collides with real titles or ids.
pub const NAME_DELIMITER: &str = "_-_-_-_-_";

/// Directory a task downloads into
pub fn task_dir(download_root: &Path, owner: &str, task_id: Uuid) -> PathBuf {
    download_root.join(owner).join(task_id.to_string())
}

/// Output template handed to the downloader via `-o`
pub fn output_template(
    download_root: &Path,
    owner: &str,
    task_id: Uuid,
    max_title_length: usize,
) -> String {
    let dir = task_dir(download_root, owner, task_id);
    format!(
        "{}/%(id)s{NAME_DELIMITER}%(title).{max_title_length}s.%(ext)s",
        dir.display()
    )
}

/// Item id encoded in a stored file name, if the name follows the template
pub fn item_id_from_file_name(file_name: &str) -> Option<&str> {
    let (id, _) = file_name.split_once(NAME_DELIMITER)?;
    if id.is_empty() { None } else { Some(id) }
}

/// Width of the zero-padded index prefix used when serving playlist
/// members as individual files
pub fn index_pad_width(total_results: usize) -> usize {
    total_results.to_string().len()
}

/// File name presented to the owner when downloading a single result.
/// Playlist members get an index prefix so a batch of saved files sorts
/// in playlist order.
pub fn serve_file_name(
    stored_file_name: &str,
    index: u32,
    total_results: usize,
    is_playlist: bool,
) -> String {
    let title_part = match stored_file_name.split_once(NAME_DELIMITER) {
        Some((_, rest)) => rest,
        None => stored_file_name,
    };
    if is_playlist {
        let width = index_pad_width(total_results);
        format!("{index:0width$}_{title_part}")
    } else {
        title_part.to_string()
    }
}
