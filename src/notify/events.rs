use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed to task owners as their downloads progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PushEvent {
    /// A new task was accepted
    TaskQueued { task_id: Uuid },
    /// The metadata pass finished and result records exist
    MetadataGathered {
        task_id: Uuid,
        result_count: usize,
        is_playlist: bool,
    },
    /// The downloader began fetching an item
    DownloadStarted { task_id: Uuid, result_id: Uuid },
    /// Download progress crossed the notification threshold
    DownloadProgress {
        task_id: Uuid,
        result_id: Option<Uuid>,
        percent: f64,
    },
    /// Transcoding of the just-fetched item began
    DownloadConverting {
        task_id: Uuid,
        result_id: Option<Uuid>,
    },
    /// An item finished and its file is available
    ResultFinished { task_id: Uuid, result_id: Uuid },
    /// An item failed; other items of the task may still succeed
    ResultErrored {
        task_id: Uuid,
        result_id: Uuid,
        message: String,
    },
    /// All items of the task were processed
    TaskFinished { task_id: Uuid },
    /// The task was cancelled on the owner's request
    TaskInterrupted { task_id: Uuid },
    /// The downloader process itself failed
    TaskFailed { task_id: Uuid },
}

impl PushEvent {
    pub fn task_id(&self) -> Uuid {
        match self {
            Self::TaskQueued { task_id }
            | Self::MetadataGathered { task_id, .. }
            | Self::DownloadStarted { task_id, .. }
            | Self::DownloadProgress { task_id, .. }
            | Self::DownloadConverting { task_id, .. }
            | Self::ResultFinished { task_id, .. }
            | Self::ResultErrored { task_id, .. }
            | Self::TaskFinished { task_id }
            | Self::TaskInterrupted { task_id }
            | Self::TaskFailed { task_id } => *task_id,
        }
    }

    /// Event name as serialized in the `event` tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskQueued { .. } => "task_queued",
            Self::MetadataGathered { .. } => "metadata_gathered",
            Self::DownloadStarted { .. } => "download_started",
            Self::DownloadProgress { .. } => "download_progress",
            Self::DownloadConverting { .. } => "download_converting",
            Self::ResultFinished { .. } => "result_finished",
            Self::ResultErrored { .. } => "result_errored",
            Self::TaskFinished { .. } => "task_finished",
            Self::TaskInterrupted { .. } => "task_interrupted",
            Self::TaskFailed { .. } => "task_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tag_serialization() {
        let task_id = Uuid::new_v4();
        let result_id = Uuid::new_v4();
        let event = PushEvent::DownloadProgress {
            task_id,
            result_id: Some(result_id),
            percent: 42.5,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "download_progress");
        assert_eq!(json["task_id"], task_id.to_string());
        assert_eq!(json["result_id"], result_id.to_string());
        assert_eq!(json["percent"], 42.5);
    }

    #[test]
    fn test_name_matches_tag() {
        let event = PushEvent::TaskInterrupted {
            task_id: Uuid::new_v4(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
