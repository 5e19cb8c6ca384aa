use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use super::models::ErrorResponse;
use crate::downloader::DownloadError;
use crate::files::FilesError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("file not available: {0}")]
    FileNotReady(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::FileNotReady(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidUrl(_) => "INVALID_URL",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::FileNotReady(_) => "FILE_NOT_READY",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(json!(body))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::TaskNotFound(id) => ApiError::NotFound(format!("task {id}")),
            StoreError::ResultNotFound(id) => ApiError::NotFound(format!("result {id}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(value: DownloadError) -> Self {
        match value {
            DownloadError::Store(inner) => inner.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FilesError> for ApiError {
    fn from(value: FilesError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        ApiError::Internal(value.to_string())
    }
}
