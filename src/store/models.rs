use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Requested audio extraction format. `None` means video download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    None,
    Best,
    Aac,
    Flac,
    Mp3,
    M4a,
    Opus,
    Vorbis,
    Wav,
}

impl AudioFormat {
    /// Format string as the downloader binary expects it, `None` for the
    /// sentinel variant.
    pub fn as_arg(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Best => Some("best"),
            Self::Aac => Some("aac"),
            Self::Flac => Some("flac"),
            Self::Mp3 => Some("mp3"),
            Self::M4a => Some("m4a"),
            Self::Opus => Some("opus"),
            Self::Vorbis => Some("vorbis"),
            Self::Wav => Some("wav"),
        }
    }
}

/// Requested video container. `None` lets the downloader pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    None,
    Mp4,
    Flv,
    Ogg,
    Webm,
    Mkv,
    Avi,
}

impl VideoFormat {
    pub fn as_arg(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Mp4 => Some("mp4"),
            Self::Flv => Some("flv"),
            Self::Ogg => Some("ogg"),
            Self::Webm => Some("webm"),
            Self::Mkv => Some("mkv"),
            Self::Avi => Some("avi"),
        }
    }
}

/// Source quality selector for video downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Single best pre-muxed stream
    #[default]
    Best,
    /// Separate best video and audio streams, merged by the transcoder
    BestSplit,
}

/// A download task as submitted by an owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Opaque owner identifier, used for notification routing and
    /// directory layout
    pub owner: String,
    pub url: String,
    pub audio_format: AudioFormat,
    pub video_format: VideoFormat,
    pub quality: QualityTier,
    pub queued_at: DateTime<Utc>,
    /// Metadata pass completed, per-item results exist
    pub metadata_gathered: bool,
    /// Main download pass completed successfully
    pub downloaded: bool,
    /// Owner requested cancellation
    pub interrupted: bool,
    /// Downloader process failed to spawn or exit cleanly
    pub downloader_errored: bool,
}

impl Task {
    pub fn new(
        owner: String,
        url: String,
        audio_format: AudioFormat,
        video_format: VideoFormat,
        quality: QualityTier,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            url,
            audio_format,
            video_format,
            quality,
            queued_at: Utc::now(),
            metadata_gathered: false,
            downloaded: false,
            interrupted: false,
            downloader_errored: false,
        }
    }

    /// Eligible for the metadata-gathering pass
    pub fn needs_metadata(&self) -> bool {
        !self.metadata_gathered && !self.interrupted && !self.downloader_errored
    }

    /// Eligible for the main download pass
    pub fn needs_download(&self) -> bool {
        self.metadata_gathered
            && !self.downloaded
            && !self.interrupted
            && !self.downloader_errored
    }

    /// No further state transitions will happen
    pub fn is_terminal(&self) -> bool {
        self.downloaded || self.interrupted || self.downloader_errored
    }
}

/// One item within a task: a single video, or one playlist entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: Uuid,
    pub task_id: Uuid,
    /// 1-based position within the task
    pub index: u32,
    /// Identifier reported by the source site, e.g. a video id.
    /// Unknown until the downloader names it.
    pub item_id: Option<String>,
    pub title: Option<String>,
    /// Resolved page URL of this specific item
    pub url: Option<String>,
    /// Absolute path on disk, set only once the item finished downloading
    pub path_to_file: Option<String>,
    /// True once the task resolved to more than one item
    pub is_part_of_playlist: bool,
    pub was_downloaded: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
}

impl TaskResult {
    pub fn new(task_id: Uuid, index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            index,
            item_id: None,
            title: None,
            url: None,
            path_to_file: None,
            is_part_of_playlist: false,
            was_downloaded: false,
            has_error: false,
            error_message: None,
        }
    }

    pub fn errored(task_id: Uuid, index: u32, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            index,
            item_id: None,
            title: None,
            url: None,
            path_to_file: None,
            is_part_of_playlist: false,
            was_downloaded: false,
            has_error: true,
            error_message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_needs_metadata_only() {
        let task = Task::new(
            "local".into(),
            "https://example.com/watch?v=abc".into(),
            AudioFormat::None,
            VideoFormat::Mp4,
            QualityTier::Best,
        );
        assert!(task.needs_metadata());
        assert!(!task.needs_download());
        assert!(!task.is_terminal());
    }

    #[test]
    fn test_metadata_gathered_unlocks_download() {
        let mut task = Task::new(
            "local".into(),
            "https://example.com".into(),
            AudioFormat::Mp3,
            VideoFormat::None,
            QualityTier::Best,
        );
        task.metadata_gathered = true;
        assert!(!task.needs_metadata());
        assert!(task.needs_download());
    }

    #[test]
    fn test_interrupted_task_is_ineligible_everywhere() {
        let mut task = Task::new(
            "local".into(),
            "https://example.com".into(),
            AudioFormat::None,
            VideoFormat::None,
            QualityTier::Best,
        );
        task.interrupted = true;
        assert!(!task.needs_metadata());
        assert!(!task.needs_download());
        assert!(task.is_terminal());

        task.interrupted = false;
        task.downloader_errored = true;
        assert!(!task.needs_metadata());
        assert!(!task.needs_download());
        assert!(task.is_terminal());
    }

    #[test]
    fn test_downloaded_task_is_terminal() {
        let mut task = Task::new(
            "local".into(),
            "https://example.com".into(),
            AudioFormat::None,
            VideoFormat::None,
            QualityTier::Best,
        );
        task.metadata_gathered = true;
        task.downloaded = true;
        assert!(!task.needs_download());
        assert!(task.is_terminal());
    }

    #[test]
    fn test_audio_format_args() {
        assert_eq!(AudioFormat::None.as_arg(), None);
        assert_eq!(AudioFormat::Mp3.as_arg(), Some("mp3"));
        assert_eq!(AudioFormat::Best.as_arg(), Some("best"));
    }

    #[test]
    fn test_format_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&AudioFormat::M4a).unwrap(), r#""m4a""#);
        assert_eq!(serde_json::to_string(&VideoFormat::Webm).unwrap(), r#""webm""#);
        let parsed: AudioFormat = serde_json::from_str(r#""opus""#).unwrap();
        assert_eq!(parsed, AudioFormat::Opus);
    }
}
