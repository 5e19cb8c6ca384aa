//! API models for task submission and status endpoints
//!
//! Clients submit a [`CreateTaskRequest`] to `POST /tasks` and poll (or
//! subscribe to `/events` for) the resulting [`TaskResponse`]. The owner
//! is carried in the `X-Vidbox-Owner` header on every call; omitting it
//! scopes the request to the shared `local` owner.

use crate::observability::MetricsSnapshot;
use crate::store::{AudioFormat, QualityTier, Task, TaskResult, VideoFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub url: String,
    #[serde(default)]
    pub audio_format: AudioFormat,
    #[serde(default)]
    pub video_format: VideoFormat,
    #[serde(default)]
    pub quality: QualityTier,
}

/// Coarse task state derived from the stored flags
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Downloading,
    Finished,
    Interrupted,
    Failed,
}

impl From<&Task> for TaskStatus {
    fn from(task: &Task) -> Self {
        if task.downloader_errored {
            TaskStatus::Failed
        } else if task.interrupted {
            TaskStatus::Interrupted
        } else if task.downloaded {
            TaskStatus::Finished
        } else if task.metadata_gathered {
            TaskStatus::Downloading
        } else {
            TaskStatus::Queued
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub owner: String,
    pub url: String,
    pub audio_format: AudioFormat,
    pub video_format: VideoFormat,
    pub quality: QualityTier,
    pub queued_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub results: Vec<ResultSnapshot>,
}

impl TaskResponse {
    pub fn from_task(task: &Task, results: &[TaskResult]) -> Self {
        Self {
            id: task.id,
            owner: task.owner.clone(),
            url: task.url.clone(),
            audio_format: task.audio_format,
            video_format: task.video_format,
            quality: task.quality,
            queued_at: task.queued_at,
            status: TaskStatus::from(task),
            results: results.iter().map(ResultSnapshot::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub id: Uuid,
    pub index: u32,
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub is_part_of_playlist: bool,
    pub was_downloaded: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
}

impl From<&TaskResult> for ResultSnapshot {
    fn from(result: &TaskResult) -> Self {
        Self {
            id: result.id,
            index: result.index,
            item_id: result.item_id.clone(),
            title: result.title.clone(),
            url: result.url.clone(),
            is_part_of_playlist: result.is_part_of_playlist,
            was_downloaded: result.was_downloaded,
            has_error: result.has_error,
            error_message: result.error_message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub metrics: MetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task() -> Task {
        Task::new(
            "local".into(),
            "https://example.com".into(),
            AudioFormat::None,
            VideoFormat::None,
            QualityTier::Best,
        )
    }

    #[test]
    fn test_status_derivation() {
        let mut task = make_task();
        assert_eq!(TaskStatus::from(&task), TaskStatus::Queued);

        task.metadata_gathered = true;
        assert_eq!(TaskStatus::from(&task), TaskStatus::Downloading);

        task.downloaded = true;
        assert_eq!(TaskStatus::from(&task), TaskStatus::Finished);

        // Failure flags dominate completion.
        task.interrupted = true;
        assert_eq!(TaskStatus::from(&task), TaskStatus::Interrupted);

        task.downloader_errored = true;
        assert_eq!(TaskStatus::from(&task), TaskStatus::Failed);
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateTaskRequest =
            serde_json::from_str(r#"{"url": "https://example.com"}"#).unwrap();
        assert_eq!(request.audio_format, AudioFormat::None);
        assert_eq!(request.video_format, VideoFormat::None);
        assert_eq!(request.quality, QualityTier::Best);
    }
}
