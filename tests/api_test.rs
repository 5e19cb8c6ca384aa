use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use vidbox::api::models::{TaskResponse, TaskStatus};
use vidbox::api::state::AppState;
use vidbox::config::Config;
use vidbox::downloader::EngineContext;
use vidbox::naming::NAME_DELIMITER;
use vidbox::notify::NotificationGateway;
use vidbox::store::{TaskResult, TaskStore};

/// Builds a router with isolated storage. The scheduler loops are not
/// spawned; these tests exercise the HTTP surface only.
fn build_test_app() -> (Router, AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut config = Config::default();
    config.server.store_path = temp_dir.path().join("store");
    config.downloader.download_root = temp_dir.path().join("downloads");

    let store = TaskStore::open(&config.server.store_path).expect("Failed to open test store");
    let gateway = NotificationGateway::new(config.notify.retry_attempts);
    let engine = EngineContext::new(
        store.clone(),
        Arc::new(gateway.clone()),
        config.downloader.clone(),
    );
    let state = AppState::new(config, store, gateway, engine);

    (vidbox::api::router(state.clone()), state, temp_dir)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_task(url: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "url": url }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state, _dir) = build_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["metrics"]["tasks_queued"], 0);
}

#[tokio::test]
async fn test_create_and_get_task() {
    let (app, _state, _dir) = build_test_app();

    let response = app
        .clone()
        .oneshot(post_task("https://example.com/watch?v=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(created.status, TaskStatus::Queued);
    assert_eq!(created.owner, "local");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/tasks/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let fetched: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.url, "https://example.com/watch?v=abc");
    assert!(fetched.results.is_empty());
}

#[tokio::test]
async fn test_owner_header_scopes_task() {
    let (app, _state, _dir) = build_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-vidbox-owner", "alice")
        .body(Body::from(
            json!({ "url": "https://example.com/watch?v=abc" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(created.owner, "alice");
}

#[tokio::test]
async fn test_create_task_rejects_bad_urls() {
    let (app, _state, _dir) = build_test_app();

    for url in ["not a url", "ftp://example.com/file", ""] {
        let response = app.clone().oneshot(post_task(url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "url: {url}");
        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_URL");
    }
}

#[tokio::test]
async fn test_get_unknown_task_is_404() {
    let (app, _state, _dir) = build_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/tasks/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_task_removes_it() {
    let (app, _state, _dir) = build_test_app();

    let response = app
        .clone()
        .oneshot(post_task("https://example.com/watch?v=abc"))
        .await
        .unwrap();
    let created: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/tasks/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/tasks/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_result_file_before_download_is_conflict() {
    let (app, state, _dir) = build_test_app();

    let response = app
        .clone()
        .oneshot(post_task("https://example.com/watch?v=abc"))
        .await
        .unwrap();
    let created: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();

    let result = TaskResult::new(created.id, 1);
    state.store.insert_result(&result).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/results/{}/file", result.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "FILE_NOT_READY");
}

#[tokio::test]
async fn test_result_file_served_with_attachment_name() {
    let (app, state, dir) = build_test_app();

    let response = app
        .clone()
        .oneshot(post_task("https://example.com/watch?v=abc"))
        .await
        .unwrap();
    let created: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();

    let file_path = dir
        .path()
        .join(format!("abc123{NAME_DELIMITER}Test_Video.mp4"));
    std::fs::write(&file_path, b"video bytes").unwrap();

    let mut result = TaskResult::new(created.id, 1);
    result.item_id = Some("abc123".into());
    result.path_to_file = Some(file_path.display().to_string());
    result.was_downloaded = true;
    state.store.insert_result(&result).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/results/{}/file", result.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"Test_Video.mp4\"");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"video bytes");
}

#[tokio::test]
async fn test_archive_requires_downloaded_items() {
    let (app, state, _dir) = build_test_app();

    let response = app
        .clone()
        .oneshot(post_task("https://example.com/playlist?list=x"))
        .await
        .unwrap();
    let created: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();

    state
        .store
        .insert_result(&TaskResult::new(created.id, 1))
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/tasks/{}/archive", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_archive_of_downloaded_playlist() {
    let (app, state, dir) = build_test_app();

    let response = app
        .clone()
        .oneshot(post_task("https://example.com/playlist?list=x"))
        .await
        .unwrap();
    let created: TaskResponse =
        serde_json::from_value(body_json(response).await).unwrap();

    for (index, item) in [(1u32, "vid1"), (2, "vid2")] {
        let file_path = dir
            .path()
            .join(format!("{item}{NAME_DELIMITER}Title{index}.mp4"));
        std::fs::write(&file_path, b"data").unwrap();

        let mut result = TaskResult::new(created.id, index);
        result.item_id = Some(item.into());
        result.path_to_file = Some(file_path.display().to_string());
        result.was_downloaded = true;
        state.store.insert_result(&result).unwrap();
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/tasks/{}/archive", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap(),
        "attachment; filename=\"playlist.zip\""
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Zip local file header magic.
    assert_eq!(&bytes[..4], b"PK\x03\x04");
}
