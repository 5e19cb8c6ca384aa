use super::error::ApiError;
use super::models::{CreateTaskRequest, HealthResponse, TaskResponse};
use super::state::AppState;
use super::validation;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::Stream;
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};
use uuid::Uuid;

use crate::downloader::interrupt;
use crate::files;
use crate::naming;
use crate::notify::PushEvent;
use crate::store::Task;

/// Owner identity header. Absent means the shared `local` owner.
pub const OWNER_HEADER: &str = "x-vidbox-owner";
const DEFAULT_OWNER: &str = "local";

fn owner_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_OWNER)
        .to_string()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        metrics: state.metrics.snapshot(),
    })
}

pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    validation::validate_url(&request.url)?;

    let owner = owner_from_headers(&headers);
    let task = Task::new(
        owner.clone(),
        request.url,
        request.audio_format,
        request.video_format,
        request.quality,
    );

    state.store.insert_task(&task)?;
    state.store.persist()?;
    state.metrics.incr_queued();
    info!(task_id = %task.id, owner, url = %task.url, "Task queued");

    state
        .engine
        .notify(&owner, PushEvent::TaskQueued { task_id: task.id })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::from_task(&task, &[])),
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.store.get_task(task_id)?;
    let results = state.store.results_for_task(task_id)?;
    Ok(Json(TaskResponse::from_task(&task, &results)))
}

/// Cancel (if running) and remove a task, its results and its files
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let task = state.store.get_task(task_id)?;

    if !task.is_terminal() {
        interrupt::interrupt_task(&state.engine, task_id).await?;
    }

    state.store.delete_task_cascade(task_id)?;
    state.store.persist()?;
    state.metrics.incr_deleted();

    // File handles can outlive the kill; retry off the request path.
    let dir = naming::task_dir(
        &state.config.downloader.download_root,
        &task.owner,
        task_id,
    );
    let attempts = state.config.cleanup.delete_retry_attempts;
    tokio::spawn(async move {
        if let Err(err) = files::remove_task_dir(&dir, attempts).await {
            error!(task_id = %task_id, error = %err, "Failed to remove task directory");
        }
    });

    info!(task_id = %task_id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Server-sent event stream of push notifications for one owner
pub async fn events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let owner = owner_from_headers(&headers);
    info!(owner, "Event stream opened");

    let rx = state.gateway.subscribe(&owner);
    let stream = ReceiverStream::new(rx)
        .map(|event| Event::default().event(event.name()).json_data(&event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Serve one finished item as a file download
pub async fn get_result_file(
    State(state): State<AppState>,
    Path(result_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.store.get_result(result_id)?;

    let Some(path) = result
        .path_to_file
        .as_deref()
        .filter(|_| result.was_downloaded)
    else {
        return Err(ApiError::FileNotReady(format!(
            "result {result_id} has not finished downloading"
        )));
    };

    let bytes = tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(format!("file for result {result_id}"))
        } else {
            ApiError::Internal(err.to_string())
        }
    })?;

    let siblings = state.store.results_for_task(result.task_id)?;
    let total = siblings.len();
    let path = std::path::Path::new(path);
    let stored_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let file_name = naming::serve_file_name(
        stored_name,
        result.index,
        total,
        result.is_part_of_playlist,
    );

    Ok((
        [
            (
                header::CONTENT_TYPE,
                files::content_type_for(path).to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}

/// Serve every downloaded item of a task as one zip archive
pub async fn get_task_archive(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // 404 for unknown tasks before looking at results.
    state.store.get_task(task_id)?;
    let results = state.store.results_for_task(task_id)?;

    if !results.iter().any(|r| r.was_downloaded && !r.has_error) {
        return Err(ApiError::FileNotReady(format!(
            "task {task_id} has no downloaded items"
        )));
    }

    let bytes = tokio::task::spawn_blocking(move || files::build_archive(&results))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", files::ARCHIVE_NAME),
            ),
        ],
        bytes,
    ))
}
